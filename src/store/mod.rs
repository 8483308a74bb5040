//! # Store Module
//!
//! SQL CRUD over the reflected tables. [`Store`] owns the SQLite connection;
//! [`ListQuery`] carries collection query arguments; rows travel as JSON
//! objects ([`Row`]) so handlers can return them unchanged.

mod query;
mod sqlite;
mod values;

pub use query::{quote_ident, Filter, FilterOp, ListQuery};
pub use sqlite::{Store, DEFAULT_PAGE_SIZE};
pub use values::{fields_from_object, json_to_sql, sql_to_json, Fields, Row};
