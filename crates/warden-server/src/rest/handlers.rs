use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use warden_core::policy::Effect;
use warden_store::{PolicyStore, ResourceStore};

use crate::error::ApiError;

use super::AppState;
use super::types::*;

/// Decision endpoint: evaluates and reports, but never gates — a deny
/// comes back as `allowed: false` with the trace, not as 403. Gating is
/// the middleware's job.
pub async fn check_access<P, R>(
    State(state): State<AppState<P, R>>,
    Json(req): Json<CheckAccessRequest>,
) -> Result<Json<CheckAccessResponse>, ApiError>
where
    P: PolicyStore + 'static,
    R: ResourceStore + 'static,
{
    match req.resource_id {
        Some(resource_id) => {
            let grant = state
                .service
                .evaluate_item(&req.principal, &req.model, &resource_id, req.action, &req.request)
                .await?;
            Ok(Json(CheckAccessResponse {
                allowed: grant.decision.is_allowed(),
                effect: grant.decision.effect,
                policies: grant.decision.policies,
            }))
        }
        None => {
            let scope = state
                .service
                .resolve_scope(&req.principal, &req.model, req.action, &req.request)
                .await?;
            let effect = if scope.has_access {
                Effect::Allow
            } else {
                Effect::Deny
            };
            Ok(Json(CheckAccessResponse {
                allowed: scope.has_access,
                effect,
                policies: Vec::new(),
            }))
        }
    }
}

pub async fn resolve_scope<P, R>(
    State(state): State<AppState<P, R>>,
    Json(req): Json<ResolveScopeRequest>,
) -> Result<Json<ResolveScopeResponse>, ApiError>
where
    P: PolicyStore + 'static,
    R: ResourceStore + 'static,
{
    let scope = state
        .service
        .resolve_scope(&req.principal, &req.model, req.action, &req.request)
        .await?;
    Ok(Json(ResolveScopeResponse {
        has_access: scope.has_access,
        filter: scope.filter,
    }))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
