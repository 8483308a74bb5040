//! # tablegate
//!
//! **tablegate** puts a REST API in front of an existing SQLite database. The
//! schema is reflected at startup: every table becomes a resource with
//! collection and item routes, served by `may` coroutines on `may_minihttp`.
//! Nothing is generated ahead of time and no models are written by hand.
//!
//! ## Architecture
//!
//! - **[`schema`]** - Reflection of tables, columns, keys and foreign keys
//! - **[`routes`]** - Route table derived from the reflected schema
//! - **[`router`]** - Radix-tree path matching
//! - **[`dispatcher`]** - Coroutine-per-handler dispatch over channels
//! - **[`handlers`]** - CRUD semantics for the generated routes
//! - **[`store`]** - SQL built from table metadata, run through `rusqlite`
//! - **[`negotiation`]** / **[`render`]** - JSON or HTML representations
//! - **[`server`]** - The `HttpService` plus built-in endpoints
//! - **[`admin`]** - Admin home page
//! - **[`hot_reload`]** - Re-reflection when the schema version changes
//! - **[`middleware`]** - Metrics and tracing around every dispatch
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Service as server::AppService
//!     participant Router as router::Router
//!     participant Dispatcher as dispatcher::Dispatcher
//!     participant Handler as handlers::crud
//!     participant Store as store::Store
//!
//!     Client->>Service: GET /api/album/1
//!     Service->>Service: negotiate(Accept)
//!     Service->>Router: route(GET, "/api/album/1")
//!     Router-->>Service: RouteMatch { handler: read_album, id: "1" }
//!     Service->>Dispatcher: dispatch(route_match, body, headers, request_id)
//!     Dispatcher->>Handler: HandlerRequest over channel
//!     Handler->>Store: get(Album, [AlbumId = 1])
//!     Store-->>Handler: Row
//!     Handler-->>Dispatcher: HandlerResponse 200
//!     Dispatcher-->>Service: HandlerResponse
//!     Service-->>Client: JSON or HTML
//! ```
//!
//! ## Generated Routes
//!
//! For a table `Album` (resource `album`):
//!
//! | Method  | Path            | Handler          |
//! |---------|-----------------|------------------|
//! | GET     | `/album`        | `list_album`     |
//! | POST    | `/album`        | `create_album`   |
//! | OPTIONS | `/album`        | `options_album`  |
//! | GET     | `/album/{id}`   | `read_album`     |
//! | PUT     | `/album/{id}`   | `replace_album`  |
//! | PATCH   | `/album/{id}`   | `update_album`   |
//! | DELETE  | `/album/{id}`   | `delete_album`   |
//! | OPTIONS | `/album/{id}`   | `options_album`  |
//!
//! Composite keys are addressed as `/{a},{b}`.
//!
//! ## Quick Start
//!
//! ```bash
//! tablegate serve --database chinook.db --base-path /api
//! curl 'localhost:8080/api/artist?Name=%25Black%25&sort=Name&page=1'
//! ```
//!
//! From code:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tablegate::server::{AppService, HttpServer};
//! use tablegate::store::Store;
//!
//! let store = Store::open("chinook.db", Duration::from_secs(5), 20)?;
//! let service = AppService::new(Arc::new(store), "/api", None)?;
//! let handle = HttpServer(service).start("0.0.0.0:8080")?;
//! handle.join().ok();
//! ```

pub mod admin;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod hot_reload;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod negotiation;
pub mod render;
pub mod router;
pub mod routes;
pub mod runtime_config;
pub mod schema;
pub mod server;
pub mod store;

pub use error::ApiError;
pub use routes::{build_routes, RouteMeta};
pub use schema::{reflect, Schema, TableMeta};
pub use store::Store;
