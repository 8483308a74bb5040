use std::time::Duration;

use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Hooks run by the [`Dispatcher`](crate::dispatcher::Dispatcher) around every handler call.
///
/// `before` may short-circuit by returning a response; the handler is then
/// skipped but `after` still runs on every middleware.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}
