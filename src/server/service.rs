use super::request::{parse_request, ParsedRequest};
use super::response::{write_html, write_json, write_raw};
use crate::admin::render_admin;
use crate::dispatcher::{Dispatcher, HandlerResponse};
use crate::error::ApiError;
use crate::handlers::register_from_routes;
use crate::ids::RequestId;
use crate::middleware::{MetricsMiddleware, TracingMiddleware};
use crate::negotiation::{negotiate, Representation};
use crate::render::{error_html, home_url, index_html, index_links, render_html};
use crate::router::Router;
use crate::routes::{build_routes, normalize_base_path, RouteMeta};
use crate::schema::Schema;
use crate::store::Store;
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use notify::RecommendedWatcher;
use serde_json::{json, Value};
use std::io;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{error, info, warn};

const GET_ONLY: &str = "Allow: GET";

/// The HTTP service: built-in endpoints plus the generated table routes.
///
/// Router, dispatcher and schema sit behind locks so a schema reload can swap
/// them while the server keeps running.
#[derive(Clone)]
pub struct AppService {
    pub router: Arc<RwLock<Router>>,
    pub dispatcher: Arc<RwLock<Dispatcher>>,
    pub schema: Arc<RwLock<Arc<Schema>>>,
    pub store: Arc<Store>,
    pub metrics: Arc<MetricsMiddleware>,
    pub base_path: String,
    /// Keeps the schema watcher alive for as long as the service exists
    pub watcher: Option<Arc<Mutex<RecommendedWatcher>>>,
}

impl AppService {
    /// Reflect the database and register a handler for every generated route.
    pub fn new(store: Arc<Store>, base_path: &str, stack_size: Option<usize>) -> Result<Self, ApiError> {
        let base_path = normalize_base_path(base_path);
        let schema = store.reflect()?;

        let metrics = Arc::new(MetricsMiddleware::new());
        let mut dispatcher = Dispatcher::new();
        if let Some(size) = stack_size {
            dispatcher.set_stack_size(size);
        }
        dispatcher.add_middleware(metrics.clone());
        dispatcher.add_middleware(Arc::new(TracingMiddleware));

        let routes = build_routes(&schema, &base_path);
        // SAFETY: handler coroutines own their store handle and table metadata.
        unsafe {
            register_from_routes(&mut dispatcher, &routes, Arc::clone(&store));
        }
        let router = Router::new(routes);

        Ok(Self {
            router: Arc::new(RwLock::new(router)),
            dispatcher: Arc::new(RwLock::new(dispatcher)),
            schema: Arc::new(RwLock::new(Arc::new(schema))),
            store,
            metrics,
            base_path,
            watcher: None,
        })
    }

    /// Schema currently served
    pub fn current_schema(&self) -> Result<Arc<Schema>, ApiError> {
        self.schema
            .read()
            .map(|s| Arc::clone(&s))
            .map_err(|_| ApiError::ServerError("schema lock poisoned".to_string()))
    }

    /// Swap in routes and handlers for a newly reflected schema.
    ///
    /// The new dispatcher keeps the existing middleware; dropping the old one
    /// closes its channels and its handler coroutines exit.
    pub fn install_schema(&self, schema: Schema) -> Result<(), ApiError> {
        let routes = build_routes(&schema, &self.base_path);
        let mut dispatcher = self
            .dispatcher
            .read()
            .map_err(|_| ApiError::ServerError("dispatcher lock poisoned".to_string()))?
            .fresh();
        // SAFETY: same as in `new`.
        unsafe {
            register_from_routes(&mut dispatcher, &routes, Arc::clone(&self.store));
        }
        let router = Router::new(routes);
        let version = schema.version;

        let poisoned = || ApiError::ServerError("service lock poisoned".to_string());
        *self.router.write().map_err(|_| poisoned())? = router;
        *self.dispatcher.write().map_err(|_| poisoned())? = dispatcher;
        *self.schema.write().map_err(|_| poisoned())? = Arc::new(schema);
        self.metrics.inc_reload();

        info!(schema_version = version, "Schema installed");
        Ok(())
    }

    fn write_error(&self, res: &mut Response, repr: Representation, err: &ApiError, headers: &[&'static str]) {
        let status = err.status();
        let body = err.to_json();
        match repr {
            Representation::Json => write_json(res, status, headers, &body),
            Representation::Html => match error_html(status, &body, &self.base_path) {
                Ok(html) => write_html(res, status, headers, html),
                Err(e) => {
                    error!(error = %e, "Error page render failed");
                    write_json(res, status, headers, &body);
                }
            },
        }
    }

    /// Built-in endpoints; `None` when `path` is not one of them
    fn builtin(&self, req: &ParsedRequest, repr: Representation, res: &mut Response) -> Option<()> {
        let path = req.path.as_str();
        let is_index = path == home_url(&self.base_path)
            || (!self.base_path.is_empty() && path == format!("{}/", self.base_path));
        if !matches!(path, "/health" | "/metrics" | "/admin") && !is_index {
            return None;
        }
        self.metrics.inc_top_level_request();

        if req.method != "GET" {
            let err = ApiError::MethodNotAllowed(format!("Method [{}] not allowed on [{path}]", req.method));
            self.write_error(res, repr, &err, &[GET_ONLY]);
            return Some(());
        }

        match path {
            "/health" => write_json(res, 200, &[], &json!({ "status": "ok" })),
            "/metrics" => write_raw(
                res,
                200,
                "Content-Type: text/plain; version=0.0.4",
                &[],
                self.metrics.render_prometheus().into_bytes(),
            ),
            "/admin" => match self
                .current_schema()
                .and_then(|schema| render_admin(&schema, &self.store, &self.base_path))
            {
                Ok(html) => write_html(res, 200, &[], html),
                Err(e) => self.write_error(res, repr, &e, &[]),
            },
            _ => self.index(repr, res),
        }
        Some(())
    }

    fn index(&self, repr: Representation, res: &mut Response) {
        let schema = match self.current_schema() {
            Ok(s) => s,
            Err(e) => return self.write_error(res, repr, &e, &[]),
        };
        match repr {
            Representation::Json => {
                let resources: Vec<Value> = index_links(&schema, &self.base_path)
                    .into_iter()
                    .map(|l| json!({ "name": l.name, "link": l.href }))
                    .collect();
                write_json(res, 200, &[], &json!({ "resources": resources }));
            }
            Representation::Html => match index_html(&schema, &self.base_path) {
                Ok(html) => write_html(res, 200, &[], html),
                Err(e) => self.write_error(res, repr, &ApiError::ServerError(e.to_string()), &[]),
            },
        }
    }

    fn write_handler_response(
        &self,
        res: &mut Response,
        repr: Representation,
        route: &RouteMeta,
        hr: HandlerResponse,
    ) {
        match repr {
            Representation::Json => write_json(res, hr.status, &hr.headers, &hr.body),
            Representation::Html if hr.status == 204 => write_raw(res, 204, "", &hr.headers, Vec::new()),
            Representation::Html => match render_html(hr.status, &hr.body, route) {
                Ok(html) => write_html(res, hr.status, &hr.headers, html),
                Err(e) => {
                    error!(handler = %route.handler_name, error = %e, "HTML render failed");
                    self.write_error(res, repr, &ApiError::ServerError(e.to_string()), &[]);
                }
            },
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);
        let request_id = RequestId::from_header_or_new(parsed.header("x-request-id"));

        let repr = match negotiate(parsed.header("accept")) {
            Ok(r) => r,
            Err(e) => {
                info!(request_id = %request_id, path = %parsed.path, "Unacceptable Accept header");
                self.write_error(res, Representation::Json, &e, &[]);
                return Ok(());
            }
        };

        if self.builtin(&parsed, repr, res).is_some() {
            return Ok(());
        }

        let Ok(method) = Method::from_bytes(parsed.method.as_bytes()) else {
            let err = ApiError::NotImplemented(format!("Method [{}] not supported", parsed.method));
            self.write_error(res, repr, &err, &[]);
            return Ok(());
        };

        let (route_opt, others) = match self.router.read() {
            Ok(router) => match router.route(method.clone(), &parsed.path) {
                Some(m) => (Some(m), Vec::new()),
                None => (None, router.routes_for_path(&parsed.path)),
            },
            Err(_) => {
                self.write_error(res, repr, &ApiError::ServerError("router lock poisoned".into()), &[]);
                return Ok(());
            }
        };

        let Some(mut route_match) = route_opt else {
            match others.first() {
                Some(route) => {
                    let err = ApiError::MethodNotAllowed(format!(
                        "Method [{method}] not acceptable for resource type [{}]",
                        route.table.name
                    ));
                    self.write_error(res, repr, &err, &[route.allow_header()]);
                }
                None => {
                    let err = ApiError::NotFound(format!("No resource at [{}]", parsed.path));
                    self.write_error(res, repr, &err, &[]);
                }
            }
            return Ok(());
        };

        let ParsedRequest {
            headers,
            query_params,
            body,
            ..
        } = parsed;
        let body = if route_match.route.action.writes() {
            match body.into_value() {
                Ok(b) => b,
                Err(e) => {
                    self.write_error(res, repr, &e, &[]);
                    return Ok(());
                }
            }
        } else {
            None
        };
        route_match.query_params = query_params;
        let route = Arc::clone(&route_match.route);

        let handler_response = match self.dispatcher.read() {
            Ok(dispatcher) => dispatcher.dispatch(route_match, body, headers, request_id),
            Err(_) => None,
        };

        match handler_response {
            Some(hr) => self.write_handler_response(res, repr, &route, hr),
            None => {
                warn!(request_id = %request_id, handler = %route.handler_name, "No handler answered");
                let err = ApiError::ServerError("Handler failed or not registered".to_string());
                self.write_error(res, repr, &err, &[]);
            }
        }
        Ok(())
    }
}
