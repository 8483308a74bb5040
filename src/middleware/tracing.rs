use std::time::Duration;

use tracing::{debug, info, warn};

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Emits one event when a request enters the handler chain and one when it leaves.
///
/// Handler coroutines hop threads, so no span is held across the call; the
/// request id ties the two events together.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &HandlerRequest) -> Option<HandlerResponse> {
        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            handler = %req.handler_name,
            "request start"
        );
        None
    }

    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        let latency_ms = latency.as_millis() as u64;
        if res.status >= 500 {
            warn!(
                request_id = %req.request_id,
                handler = %req.handler_name,
                status = res.status,
                latency_ms,
                "request failed"
            );
        } else {
            info!(
                request_id = %req.request_id,
                method = %req.method,
                handler = %req.handler_name,
                status = res.status,
                latency_ms,
                "request complete"
            );
        }
    }
}
