//! Request metrics via the `metrics` facade.
//!
//! Install any `metrics` recorder in the host application, then register
//! [`MetricsObserver`] on the agent.

use crate::hooks::{RequestEvent, RequestObserver};

/// Record one API call with its duration.
pub fn record_request(path: &str, outcome: &'static str, duration_secs: f64) {
    let labels = [("path", path.to_string()), ("outcome", outcome.to_string())];
    metrics::counter!("centrifugo_api_requests_total", &labels).increment(1);
    metrics::histogram!("centrifugo_api_request_duration_seconds", &labels).record(duration_secs);
}

/// Feeds every call into [`record_request`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl RequestObserver for MetricsObserver {
    fn on_fulfilled(&self, event: &RequestEvent) {
        record_request(&event.path, "fulfilled", event.duration.as_secs_f64());
    }

    fn on_failed(&self, event: &RequestEvent) {
        record_request(&event.path, "failed", event.duration.as_secs_f64());
    }
}
