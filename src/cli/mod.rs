//! # CLI Module
//!
//! ## `serve`
//!
//! Reflect a SQLite database and serve it:
//!
//! ```bash
//! tablegate serve --database chinook.db --base-path /api --watch
//! ```
//!
//! Options:
//! - `--database <FILE>` - existing SQLite file (or `TABLEGATE_DATABASE`)
//! - `--config <FILE>` - YAML configuration; flags override it
//! - `--addr <ADDR>` - bind address, default `0.0.0.0:8080`
//! - `--base-path <PATH>` - prefix for table routes
//! - `--page-size <N>` - rows per page when `?page=` is given, default 20
//! - `--watch` - reload routes when the schema changes
//!
//! SIGINT and SIGTERM stop the server.
//!
//! ## `inspect`
//!
//! Print the reflected tables and the generated route table:
//!
//! ```bash
//! tablegate inspect --database chinook.db
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run, run_cli, start_server, Cli, Commands};
