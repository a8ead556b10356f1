use serde::{Deserialize, Serialize};

use warden_core::context::RequestMeta;
use warden_core::decision::PolicyTrace;
use warden_core::engine::ScopeFilter;
use warden_core::policy::Effect;
use warden_core::principal::{Action, Principal};

#[derive(Debug, Deserialize)]
pub struct CheckAccessRequest {
    pub principal: Principal,
    pub model: String,
    pub action: Action,
    /// Absent means a collection-level check: is the model reachable at
    /// all for this principal and action.
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub request: RequestMeta,
}

#[derive(Debug, Serialize)]
pub struct CheckAccessResponse {
    pub allowed: bool,
    pub effect: Effect,
    pub policies: Vec<PolicyTrace>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveScopeRequest {
    pub principal: Principal,
    pub model: String,
    pub action: Action,
    #[serde(default)]
    pub request: RequestMeta,
}

#[derive(Debug, Serialize)]
pub struct ResolveScopeResponse {
    pub has_access: bool,
    pub filter: ScopeFilter,
}
