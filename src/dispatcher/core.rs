//! Dispatcher core - hands matched requests to handler coroutines.

use crate::error::ApiError;
use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::router::{ParamVec, RouteMatch};
use crate::runtime_config::RuntimeConfig;
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Request header storage; names are lower-cased by the server.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Extra response header lines (`"Name: value"`).
///
/// `may_minihttp` only accepts `&'static str` header lines, so every header a
/// handler can emit is a constant.
pub type StaticHeaders = SmallVec<[&'static str; 4]>;

/// Request data passed to a handler coroutine
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// Route pattern the request matched, e.g. `/artist/{id}`
    pub path: String,
    pub handler_name: String,
    pub path_params: ParamVec,
    /// Query parameters in order of appearance; repeated keys are kept
    pub query_params: ParamVec,
    pub headers: HeaderVec,
    /// Parsed body: JSON as sent, or an object of strings for form posts
    pub body: Option<Value>,
    /// Channel for sending the response back to the dispatcher
    pub reply_tx: mpsc::Sender<HandlerResponse>,
}

impl HandlerRequest {
    /// Get a path parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response data sent back from a handler coroutine
///
/// The body is representation-neutral; the server renders it as JSON or HTML
/// after content negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: StaticHeaders,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: StaticHeaders, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status, StaticHeaders::new(), body)
    }

    /// Empty `204 No Content`
    #[must_use]
    pub fn no_content() -> Self {
        Self::json(204, Value::Null)
    }

    /// Error response with an `{"error": message}` body
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Add a static header line such as `"Allow: GET, POST, OPTIONS"`
    #[must_use]
    pub fn with_header(mut self, line: &'static str) -> Self {
        self.headers.push(line);
        self
    }
}

impl From<ApiError> for HandlerResponse {
    fn from(err: ApiError) -> Self {
        Self::json(err.status(), err.to_json())
    }
}

/// Type alias for a channel sender that dispatches requests to a handler
pub type HandlerSender = mpsc::Sender<HandlerRequest>;

/// Routes requests to registered handler coroutines through the middleware chain
#[derive(Clone)]
pub struct Dispatcher {
    pub handlers: HashMap<String, HandlerSender>,
    pub middlewares: Vec<Arc<dyn Middleware>>,
    stack_size: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create an empty dispatcher; the coroutine stack size comes from
    /// `TABLEGATE_STACK_SIZE` (see [`RuntimeConfig`]).
    #[must_use]
    pub fn new() -> Self {
        Dispatcher {
            handlers: HashMap::new(),
            middlewares: Vec::new(),
            stack_size: RuntimeConfig::from_env().stack_size,
        }
    }

    /// Empty dispatcher sharing this one's middleware and stack size.
    ///
    /// Used on schema reload: handlers are registered anew while metrics keep
    /// accumulating in the same middleware instances.
    #[must_use]
    pub fn fresh(&self) -> Self {
        Dispatcher {
            handlers: HashMap::new(),
            middlewares: self.middlewares.clone(),
            stack_size: self.stack_size,
        }
    }

    pub fn set_stack_size(&mut self, stack_size: usize) {
        self.stack_size = stack_size;
    }

    #[must_use]
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    /// Middleware runs in insertion order, `before` and `after` alike
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    /// Registers a handler function that processes requests sent under `name`.
    ///
    /// Spawns a coroutine reading from a channel. A panic inside `handler_fn`
    /// is caught and turned into a 500 response.
    ///
    /// Registering a name twice replaces the earlier handler; its channel is
    /// dropped and its coroutine exits.
    ///
    /// # Safety
    ///
    /// `may::coroutine::Builder::spawn()` is unsafe. The caller must ensure the
    /// `may` runtime is configured and that `handler_fn` sends exactly one
    /// response per request.
    pub unsafe fn register_handler<F>(&mut self, name: &str, handler_fn: F)
    where
        F: Fn(HandlerRequest) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let name = name.to_string();
        let coroutine_name = name.clone();
        let stack_size = self.stack_size;

        // SAFETY: the closure owns everything it touches and replies go through
        // the request's channel, never a borrowed reference.
        let spawn_result = unsafe {
            coroutine::Builder::new()
                .name(name.clone())
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(handler_name = %coroutine_name, stack_size, "Handler coroutine start");

                    for req in rx.iter() {
                        let reply_tx = req.reply_tx.clone();
                        let request_id = req.request_id;

                        if let Err(panic) =
                            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                                handler_fn(req);
                            }))
                        {
                            let panic_message = panic
                                .downcast_ref::<&str>()
                                .map(|s| (*s).to_string())
                                .or_else(|| panic.downcast_ref::<String>().cloned())
                                .unwrap_or_else(|| "unknown panic".to_string());
                            error!(
                                request_id = %request_id,
                                handler_name = %coroutine_name,
                                panic_message = %panic_message,
                                "Handler panicked"
                            );
                            let _ = reply_tx.send(HandlerResponse::error(500, "Internal server error"));
                        }
                    }

                    debug!(handler_name = %coroutine_name, "Handler coroutine exit");
                })
        };

        if let Err(e) = spawn_result {
            error!(
                handler_name = %name,
                error = %e,
                stack_size,
                "Failed to spawn handler coroutine"
            );
            return;
        }

        if self.handlers.insert(name.clone(), tx).is_some() {
            warn!(handler_name = %name, "Replaced existing handler");
        }
    }

    /// Dispatch a matched request to its handler and wait for the reply.
    ///
    /// Returns `None` when no handler is registered under the route's handler
    /// name or the channel to it is closed.
    #[must_use]
    pub fn dispatch(
        &self,
        route_match: RouteMatch,
        body: Option<Value>,
        headers: HeaderVec,
        request_id: RequestId,
    ) -> Option<HandlerResponse> {
        let Some(tx) = self.handlers.get(&route_match.handler_name) else {
            error!(
                request_id = %request_id,
                handler_name = %route_match.handler_name,
                available_handlers = self.handlers.len(),
                "Handler not found"
            );
            return None;
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        let request = HandlerRequest {
            request_id,
            method: route_match.route.method.clone(),
            path: route_match.route.path_pattern.clone(),
            handler_name: route_match.handler_name,
            path_params: route_match.path_params,
            query_params: route_match.query_params,
            headers,
            body,
            reply_tx,
        };

        let mut early_resp: Option<HandlerResponse> = None;
        for mw in &self.middlewares {
            if early_resp.is_none() {
                early_resp = mw.before(&request);
            } else {
                let _ = mw.before(&request);
            }
        }

        let start = Instant::now();
        let mut resp = match early_resp {
            Some(r) => r,
            None => {
                if let Err(e) = tx.send(request.clone()) {
                    error!(
                        request_id = %request_id,
                        handler_name = %request.handler_name,
                        error = %e,
                        "Failed to send request to handler"
                    );
                    return None;
                }
                match reply_rx.recv() {
                    Ok(response) => response,
                    Err(e) => {
                        error!(
                            request_id = %request_id,
                            handler_name = %request.handler_name,
                            error = %e,
                            "Handler channel closed before replying"
                        );
                        HandlerResponse::error(503, "Handler is not responding")
                    }
                }
            }
        };
        let latency: Duration = start.elapsed();

        for mw in &self.middlewares {
            mw.after(&request, &mut resp, latency);
        }

        info!(
            request_id = %request_id,
            handler_name = %request.handler_name,
            status = resp.status,
            latency_ms = latency.as_millis() as u64,
            "Handler response received"
        );
        Some(resp)
    }
}
