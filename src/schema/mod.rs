//! # Schema Module
//!
//! Reflects the catalog of a SQLite database into [`TableMeta`] descriptions.
//!
//! Reflection reads `sqlite_master`, `pragma_table_info` and
//! `pragma_foreign_key_list`; each table becomes a resource whose URL segment
//! is the lower-cased table name. Column affinity ([`ColumnType`]) drives how
//! textual input (path ids, query filters, form fields) is converted before it
//! is bound to a statement.

mod reflect;
mod types;

pub use reflect::{reflect, schema_version};
pub use types::{ColumnMeta, ColumnType, ForeignKey, Schema, TableMeta};
