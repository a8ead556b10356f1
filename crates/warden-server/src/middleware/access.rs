use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use warden_core::context::RequestMeta;
use warden_core::engine::DataScope;
use warden_core::principal::{Action, Principal};
use warden_store::{PolicyStore, ResourceStore};

use crate::error::ApiError;
use crate::service::{AccessService, ItemGrant};

pub struct AccessState<P: PolicyStore, R: ResourceStore> {
    pub service: Arc<AccessService<P, R>>,
}

impl<P: PolicyStore, R: ResourceStore> Clone for AccessState<P, R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Item,
    Collection,
}

/// What a guarded route represents: which model, which verb, and
/// whether the route addresses one row or the whole collection.
#[derive(Debug, Clone)]
pub struct RouteTarget {
    pub model: &'static str,
    pub action: Action,
    pub kind: RouteKind,
}

impl RouteTarget {
    pub fn item(model: &'static str, action: Action) -> Self {
        Self {
            model,
            action,
            kind: RouteKind::Item,
        }
    }

    pub fn collection(model: &'static str, action: Action) -> Self {
        Self {
            model,
            action,
            kind: RouteKind::Collection,
        }
    }
}

/// The decision outcome a passed check leaves in request extensions for
/// the handler: the decision plus fetched resource for item routes, the
/// compiled row filter for collection routes.
#[derive(Debug, Clone)]
pub enum AccessGrant {
    Item(ItemGrant),
    Collection(DataScope),
}

/// Route-guarding middleware, attached per route with
/// `axum::middleware::from_fn_with_state((state, target), require_access)`.
/// Performs exactly one evaluation per request; denials short-circuit
/// with the mapped status and never reach the handler.
pub async fn require_access<P, R>(
    State((state, target)): State<(AccessState<P, R>, RouteTarget)>,
    mut request: Request<Body>,
    next: Next,
) -> Response
where
    P: PolicyStore + 'static,
    R: ResourceStore + 'static,
{
    let principal = match extract_principal(&request) {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };
    let meta = request_meta(&request);

    let grant = match target.kind {
        RouteKind::Item => {
            let Some(id) = item_id(request.uri().path()) else {
                return ApiError::InvalidInput("missing resource id in path".to_string())
                    .into_response();
            };
            match state
                .service
                .authorize_item(&principal, target.model, &id, target.action, &meta)
                .await
            {
                Ok(grant) => AccessGrant::Item(grant),
                Err(e) => return e.into_response(),
            }
        }
        RouteKind::Collection => {
            match state
                .service
                .authorize_collection(&principal, target.model, target.action, &meta)
                .await
            {
                Ok(scope) => AccessGrant::Collection(scope),
                Err(e) => return e.into_response(),
            }
        }
    };

    request.extensions_mut().insert(grant);
    next.run(request).await
}

/// The principal is normally inserted by an upstream authentication
/// layer; the `x-warden-principal` JSON header is the development-mode
/// fallback. Authentication itself is out of scope here.
fn extract_principal(request: &Request<Body>) -> Result<Principal, ApiError> {
    if let Some(principal) = request.extensions().get::<Principal>() {
        return Ok(principal.clone());
    }
    let Some(header) = request.headers().get("x-warden-principal") else {
        return Err(ApiError::InvalidInput("missing principal".to_string()));
    };
    let raw = header
        .to_str()
        .map_err(|_| ApiError::InvalidInput("malformed principal header".to_string()))?;
    serde_json::from_str(raw)
        .map_err(|e| ApiError::InvalidInput(format!("malformed principal: {e}")))
}

fn request_meta(request: &Request<Body>) -> RequestMeta {
    RequestMeta {
        method: Some(request.method().to_string()),
        path: Some(request.uri().path().to_string()),
        client_addr: header_string(request, "x-forwarded-for"),
        user_agent: header_string(request, "user-agent"),
        query: request.uri().query().map(parse_query).unwrap_or_default(),
    }
}

fn header_string(request: &Request<Body>, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn parse_query(raw: &str) -> BTreeMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn item_id(path: &str) -> Option<String> {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
