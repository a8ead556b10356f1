use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[derive(Debug, Default)]
pub struct Metrics {
    request_total: AtomicU64,
    request_success: AtomicU64,
    request_error: AtomicU64,
    decisions_allowed: AtomicU64,
    decisions_denied: AtomicU64,
    scope_resolutions: AtomicU64,
    store_errors: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.request_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.request_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.request_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decision(&self, allowed: bool) {
        if allowed {
            self.decisions_allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.decisions_denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_scope_resolution(&self) {
        self.scope_resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_total(&self) -> u64 {
        self.request_total.load(Ordering::Relaxed)
    }

    pub fn request_success(&self) -> u64 {
        self.request_success.load(Ordering::Relaxed)
    }

    pub fn request_error(&self) -> u64 {
        self.request_error.load(Ordering::Relaxed)
    }

    pub fn decisions_allowed(&self) -> u64 {
        self.decisions_allowed.load(Ordering::Relaxed)
    }

    pub fn decisions_denied(&self) -> u64 {
        self.decisions_denied.load(Ordering::Relaxed)
    }

    pub fn scope_resolutions(&self) -> u64 {
        self.scope_resolutions.load(Ordering::Relaxed)
    }

    pub fn store_errors(&self) -> u64 {
        self.store_errors.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let mut output = String::new();
        output.push_str("# HELP warden_requests_total Total number of requests.\n");
        output.push_str("# TYPE warden_requests_total counter\n");
        output.push_str(&format!("warden_requests_total {}\n", self.request_total()));
        output.push_str("# HELP warden_requests_success_total Total successful requests.\n");
        output.push_str("# TYPE warden_requests_success_total counter\n");
        output.push_str(&format!(
            "warden_requests_success_total {}\n",
            self.request_success()
        ));
        output.push_str("# HELP warden_requests_error_total Total failed requests.\n");
        output.push_str("# TYPE warden_requests_error_total counter\n");
        output.push_str(&format!(
            "warden_requests_error_total {}\n",
            self.request_error()
        ));
        output.push_str("# HELP warden_decisions_allowed_total Item decisions that allowed.\n");
        output.push_str("# TYPE warden_decisions_allowed_total counter\n");
        output.push_str(&format!(
            "warden_decisions_allowed_total {}\n",
            self.decisions_allowed()
        ));
        output.push_str("# HELP warden_decisions_denied_total Item decisions that denied.\n");
        output.push_str("# TYPE warden_decisions_denied_total counter\n");
        output.push_str(&format!(
            "warden_decisions_denied_total {}\n",
            self.decisions_denied()
        ));
        output.push_str("# HELP warden_scope_resolutions_total Collection scope resolutions.\n");
        output.push_str("# TYPE warden_scope_resolutions_total counter\n");
        output.push_str(&format!(
            "warden_scope_resolutions_total {}\n",
            self.scope_resolutions()
        ));
        output.push_str("# HELP warden_store_errors_total Policy or resource store failures.\n");
        output.push_str("# TYPE warden_store_errors_total counter\n");
        output.push_str(&format!("warden_store_errors_total {}\n", self.store_errors()));
        output
    }
}

pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics.render_prometheus(),
    )
}
