use warden_core::decision::Decision;
use warden_core::engine::DataScope;
use warden_core::policy::Effect;
use warden_core::principal::{Action, PrincipalId};

pub fn new_decision_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn audit_decision(
    decision_id: &str,
    principal: &PrincipalId,
    model: &str,
    action: Action,
    resource_id: Option<&str>,
    decision: &Decision,
) {
    let decisive = decision
        .decisive()
        .map(|t| t.policy_id.as_str())
        .unwrap_or("");
    tracing::info!(
        target: "audit",
        event = "decision",
        decision_id = decision_id,
        principal = %principal,
        model = model,
        action = %action,
        resource_id = resource_id.unwrap_or(""),
        effect = if decision.effect == Effect::Allow { "allow" } else { "deny" },
        decisive_policy = decisive,
        considered = decision.policies.len(),
        "access decision"
    );
}

pub fn audit_scope_resolution(
    decision_id: &str,
    principal: &PrincipalId,
    model: &str,
    action: Action,
    scope: &DataScope,
) {
    tracing::info!(
        target: "audit",
        event = "scope_resolution",
        decision_id = decision_id,
        principal = %principal,
        model = model,
        action = %action,
        has_access = scope.has_access,
        constraint_groups = scope.filter.any_of.len(),
        "data scope resolved"
    );
}

pub fn audit_policy_reload(version: u64, policy_count: usize) {
    tracing::info!(
        target: "audit",
        event = "policy_reload",
        version = version,
        policy_count = policy_count,
        "policy snapshot installed"
    );
}

pub fn audit_store_failure(principal: &PrincipalId, model: &str, action: Action, error: &str) {
    tracing::warn!(
        target: "audit",
        event = "store_failure",
        principal = %principal,
        model = model,
        action = %action,
        error = error,
        "policy lookup failed, request denied"
    );
}
