mod condition;
mod validation;

pub use condition::{AttrRef, Compare, CompareOp, Condition, Operand};
pub use validation::{PolicyLimits, ValidationError, validate_policies};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::AttrValue;
use crate::principal::{Action, ActionScope, PermissionKey};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(String);

impl PolicyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// A named rule scoped to one resource model and one action (or the
/// wildcard). Policies are data: authored out of band, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub model: String,
    pub action: ActionScope,
    pub effect: Effect,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub condition: Condition,
}

impl Policy {
    pub fn applies_to(&self, model: &str, action: Action) -> bool {
        self.model == model && self.action.covers(action)
    }

    /// The baseline allow rule for a model+action: access is granted to
    /// any principal holding the `<model>.<action>` permission key,
    /// with no resource restriction. Restrictive policies layer on top.
    pub fn baseline(model: &str, action: Action) -> Self {
        let key = PermissionKey::new(model, action);
        Self {
            id: PolicyId::new(format!("{key}.baseline")),
            model: model.to_string(),
            action: ActionScope::One(action),
            effect: Effect::Allow,
            priority: 0,
            condition: Condition::compare(
                AttrRef::subject("permissions"),
                CompareOp::Contains,
                Operand::Value(AttrValue::Str(key.to_string())),
            ),
        }
    }
}
