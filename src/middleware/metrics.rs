use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Lock-free request counters exported on `/metrics`.
///
/// Tracks handler requests, their latency, 4xx/5xx outcomes and the
/// coroutine stack size, plus requests to built-in endpoints that never reach
/// the dispatcher (`/health`, `/metrics`, `/`, `/admin`).
#[derive(Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    client_errors: AtomicUsize,
    server_errors: AtomicUsize,
    stack_size: AtomicUsize,
    top_level_requests: AtomicUsize,
    reloads: AtomicUsize,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean handler latency; zero before the first request
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    #[must_use]
    pub fn client_errors(&self) -> usize {
        self.client_errors.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn server_errors(&self) -> usize {
        self.server_errors.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn stack_size(&self) -> usize {
        self.stack_size.load(Ordering::Relaxed)
    }

    pub fn inc_top_level_request(&self) {
        self.top_level_requests.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn top_level_request_count(&self) -> usize {
        self.top_level_requests.load(Ordering::Relaxed)
    }

    /// Count a completed schema reload
    pub fn inc_reload(&self) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::Relaxed)
    }

    /// Prometheus text exposition of every counter
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        format!(
            "# HELP tablegate_requests_total Total number of handled requests\n\
             # TYPE tablegate_requests_total counter\n\
             tablegate_requests_total {}\n\
             # HELP tablegate_request_latency_seconds Average request latency in seconds\n\
             # TYPE tablegate_request_latency_seconds gauge\n\
             tablegate_request_latency_seconds {}\n\
             # HELP tablegate_responses_client_error_total Responses with a 4xx status\n\
             # TYPE tablegate_responses_client_error_total counter\n\
             tablegate_responses_client_error_total {}\n\
             # HELP tablegate_responses_server_error_total Responses with a 5xx status\n\
             # TYPE tablegate_responses_server_error_total counter\n\
             tablegate_responses_server_error_total {}\n\
             # HELP tablegate_top_level_requests_total Requests served by built-in endpoints\n\
             # TYPE tablegate_top_level_requests_total counter\n\
             tablegate_top_level_requests_total {}\n\
             # HELP tablegate_schema_reloads_total Schema reloads applied\n\
             # TYPE tablegate_schema_reloads_total counter\n\
             tablegate_schema_reloads_total {}\n\
             # HELP tablegate_coroutine_stack_bytes Configured coroutine stack size\n\
             # TYPE tablegate_coroutine_stack_bytes gauge\n\
             tablegate_coroutine_stack_bytes {}\n",
            self.request_count(),
            self.average_latency().as_secs_f64(),
            self.client_errors(),
            self.server_errors(),
            self.top_level_request_count(),
            self.reload_count(),
            self.stack_size(),
        )
    }
}

impl Middleware for MetricsMiddleware {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn after(&self, _req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        match res.status {
            400..=499 => {
                self.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        let size = if may::coroutine::is_coroutine() {
            may::coroutine::current().stack_size()
        } else {
            may::config().get_stack_size()
        };
        self.stack_size.store(size, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_text_lists_counters() {
        let m = MetricsMiddleware::new();
        m.inc_top_level_request();
        m.inc_top_level_request();
        let text = m.render_prometheus();
        assert!(text.contains("tablegate_requests_total 0\n"));
        assert!(text.contains("tablegate_top_level_requests_total 2\n"));
        assert!(text.contains("# TYPE tablegate_schema_reloads_total counter"));
    }

    #[test]
    fn test_average_latency_zero_without_requests() {
        assert_eq!(MetricsMiddleware::new().average_latency(), Duration::ZERO);
    }
}
