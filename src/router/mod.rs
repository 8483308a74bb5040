//! # Router Module
//!
//! Path matching for the endpoints generated from the reflected schema.
//!
//! Routes are inserted into a radix tree at startup (and again after a schema
//! reload). For each request the tree is walked segment by segment; `{id}`
//! segments capture the percent-decoded resource id.
//!
//! ```rust,ignore
//! use tablegate::router::Router;
//! use http::Method;
//!
//! let router = Router::new(tablegate::routes::build_routes(&schema, ""));
//! if let Some(m) = router.route(Method::GET, "/artist/1") {
//!     assert_eq!(m.handler_name, "read_artist");
//!     assert_eq!(m.get_path_param("id"), Some("1"));
//! }
//! ```

mod core;
mod radix;
#[cfg(test)]
mod tests;

pub use core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
