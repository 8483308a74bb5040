//! # Routes Module
//!
//! Turns a reflected [`Schema`](crate::schema::Schema) into the route table the
//! [`Router`](crate::router::Router) and [`Dispatcher`](crate::dispatcher::Dispatcher)
//! are built from. Every table contributes a collection path and an item path;
//! each (method, path) pair is a [`RouteMeta`] naming the handler that serves it.

mod build;
mod types;

pub use build::{build_routes, normalize_base_path, RESERVED_RESOURCES};
pub use types::{collection_href, Action, RouteMeta, COLLECTION_ALLOW, ITEM_ALLOW};
