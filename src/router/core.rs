//! Router core - matching requests against the route table built from the schema.

use crate::routes::RouteMeta;
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

use super::radix::RadixRouter;

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter storage for the hot path: names are shared `Arc<str>` from the
/// route tree, values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteMeta>,
    /// Path parameters extracted from the URL (`{id}` → `("id", "42")`)
    pub path_params: ParamVec,
    pub handler_name: String,
    /// Query string parameters in order of appearance (populated by the server)
    pub query_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Router that matches HTTP requests to table handlers
#[derive(Clone, Default)]
pub struct Router {
    radix_router: RadixRouter,
    routes: Vec<Arc<RouteMeta>>,
}

impl Router {
    #[must_use]
    pub fn new(routes: Vec<RouteMeta>) -> Self {
        let routes: Vec<Arc<RouteMeta>> = routes.into_iter().map(Arc::new).collect();
        let radix_router = RadixRouter::new(&routes);

        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|r| format!("{} {}{}", r.method, r.base_path, r.path_pattern))
            .collect();
        info!(
            routes_count = routes.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Self {
            radix_router,
            routes,
        }
    }

    /// Match an HTTP request to a route
    ///
    /// Returns `None` both when the path is unknown and when the path exists
    /// under other methods; use [`Router::routes_for_path`] to tell them apart.
    #[must_use]
    pub fn route(&self, method: Method, path: &str) -> Option<RouteMatch> {
        let start = std::time::Instant::now();
        let result = self.radix_router.route(&method, path);

        match result {
            Some((route, params)) => {
                debug!(
                    method = %method,
                    path = %path,
                    handler_name = %route.handler_name,
                    path_params = ?params,
                    duration_us = start.elapsed().as_micros() as u64,
                    "Route matched"
                );
                Some(RouteMatch {
                    handler_name: route.handler_name.clone(),
                    route,
                    path_params: params,
                    query_params: ParamVec::new(),
                })
            }
            None => {
                debug!(method = %method, path = %path, "No route matched");
                None
            }
        }
    }

    /// Every route registered on `path` regardless of method
    #[must_use]
    pub fn routes_for_path(&self, path: &str) -> Vec<Arc<RouteMeta>> {
        self.radix_router.routes_for_path(path)
    }

    #[must_use]
    pub fn routes(&self) -> &[Arc<RouteMeta>] {
        &self.routes
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.routes.len());
        for r in &self.routes {
            println!(
                "[route] {:<7} {}{} -> {} ({})",
                r.method.as_str(),
                r.base_path,
                r.path_pattern,
                r.handler_name,
                r.table.name
            );
        }
    }
}
