mod handlers;
mod types;

pub use types::{
    CheckAccessRequest, CheckAccessResponse, ResolveScopeRequest, ResolveScopeResponse,
};

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};

use warden_store::{PolicyStore, ResourceStore};

use crate::metrics::Metrics;
use crate::service::AccessService;

const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1 MB

pub struct AppState<P: PolicyStore, R: ResourceStore> {
    pub service: Arc<AccessService<P, R>>,
    pub metrics: Arc<Metrics>,
}

impl<P: PolicyStore, R: ResourceStore> Clone for AppState<P, R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

async fn metrics_middleware<P, R>(
    State(state): State<AppState<P, R>>,
    request: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> Response
where
    P: PolicyStore + 'static,
    R: ResourceStore + 'static,
{
    state.metrics.record_request();

    let response = next.run(request).await;

    if response.status().is_success() {
        state.metrics.record_success();
    } else {
        state.metrics.record_error();
    }

    response
}

pub fn create_router<P, R>(state: AppState<P, R>) -> Router
where
    P: PolicyStore + 'static,
    R: ResourceStore + 'static,
{
    Router::new()
        .route("/v1/access/check", post(handlers::check_access))
        .route("/v1/access/scope", post(handlers::resolve_scope))
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .with_state(state)
}
