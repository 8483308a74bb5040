//! # Server Module
//!
//! The `may_minihttp` service that ties everything together: request parsing,
//! content negotiation, the built-in endpoints (`/health`, `/metrics`,
//! `/admin` and the resource index), routing, dispatch and rendering.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_body, parse_query_params, parse_request, ParsedRequest, RequestBody};
pub use response::status_reason;
pub use service::AppService;
