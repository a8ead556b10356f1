use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use warden_core::decision::PolicyTrace;
use warden_core::engine::EvaluateError;
use warden_store::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("resource not found")]
    NotFound,

    /// Denial carries the matched traces only; unmatched policies are
    /// not disclosed to callers.
    #[error("access denied")]
    AccessDenied { matched: Vec<PolicyTrace> },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("policy store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<EvaluateError> for ApiError {
    fn from(err: EvaluateError) -> Self {
        match err {
            EvaluateError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            EvaluateError::StoreUnavailable(msg) => ApiError::StoreUnavailable(msg),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Always present. Empty means deny-by-default: no policy matched.
    pub matched_policies: Vec<PolicyTrace>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            // A store fault must never read as a denial the caller could
            // retry around, and never as an allow.
            ApiError::Storage(_) | ApiError::StoreUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let matched_policies = match &self {
            ApiError::AccessDenied { matched } => matched.clone(),
            _ => Vec::new(),
        };
        let body = ErrorResponse {
            error: self.to_string(),
            matched_policies,
        };
        (status, Json(body)).into_response()
    }
}
