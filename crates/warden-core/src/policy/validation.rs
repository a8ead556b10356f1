use std::collections::{BTreeMap, BTreeSet};

use super::Policy;
use crate::principal::Action;
use crate::registry::ModelRegistry;

#[derive(Debug, Clone)]
pub struct PolicyLimits {
    pub max_policies_per_scope: usize,
    pub max_condition_depth: usize,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            max_policies_per_scope: 100,
            max_condition_depth: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("duplicate policy id '{id}'")]
    DuplicatePolicyId { id: String },

    #[error("policy '{policy_id}' targets unknown model '{model}'")]
    UnknownModel { policy_id: String, model: String },

    #[error("policy '{policy_id}' references unknown field '{field}' on model '{model}'")]
    UnknownField {
        policy_id: String,
        model: String,
        field: String,
    },

    #[error("policy '{policy_id}' condition depth {depth} exceeds limit {limit}")]
    ConditionTooDeep {
        policy_id: String,
        depth: usize,
        limit: usize,
    },

    #[error("{count} policies for scope '{model}.{action}' exceeds limit {limit}")]
    TooManyPolicies {
        model: String,
        action: Action,
        count: usize,
        limit: usize,
    },
}

/// Validate a policy set against the model registry and limits before it
/// is installed as a snapshot. Returns every violation found, not just
/// the first one.
pub fn validate_policies(
    policies: &[Policy],
    registry: &ModelRegistry,
    limits: &PolicyLimits,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut seen_ids = BTreeSet::new();
    for policy in policies {
        if !seen_ids.insert(policy.id.as_str()) {
            errors.push(ValidationError::DuplicatePolicyId {
                id: policy.id.as_str().to_string(),
            });
        }
    }

    for policy in policies {
        let Some(descriptor) = registry.get(&policy.model) else {
            errors.push(ValidationError::UnknownModel {
                policy_id: policy.id.as_str().to_string(),
                model: policy.model.clone(),
            });
            continue;
        };

        // An empty field list on the descriptor means the model's fields
        // are not declared; any resource reference passes.
        if !descriptor.fields.is_empty() {
            for field in policy.condition.resource_fields() {
                if !descriptor.fields.iter().any(|f| f == field) {
                    errors.push(ValidationError::UnknownField {
                        policy_id: policy.id.as_str().to_string(),
                        model: policy.model.clone(),
                        field: field.to_string(),
                    });
                }
            }
        }

        let depth = policy.condition.depth();
        if depth > limits.max_condition_depth {
            errors.push(ValidationError::ConditionTooDeep {
                policy_id: policy.id.as_str().to_string(),
                depth,
                limit: limits.max_condition_depth,
            });
        }
    }

    let mut per_scope: BTreeMap<(&str, Action), usize> = BTreeMap::new();
    for policy in policies {
        for action in Action::ALL {
            if policy.action.covers(action) {
                *per_scope.entry((&policy.model, action)).or_default() += 1;
            }
        }
    }
    for ((model, action), count) in per_scope {
        if count > limits.max_policies_per_scope {
            errors.push(ValidationError::TooManyPolicies {
                model: model.to_string(),
                action,
                count,
                limit: limits.max_policies_per_scope,
            });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AttrValue;
    use crate::policy::{AttrRef, CompareOp, Condition, Effect, Operand, PolicyId};
    use crate::principal::ActionScope;
    use crate::registry::{ModelDescriptor, ModelRegistry};

    fn registry_with_colleges() -> ModelRegistry {
        ModelRegistry::from_descriptors(vec![ModelDescriptor {
            name: "colleges".to_string(),
            fields: vec!["owner_id".to_string(), "status".to_string()],
        }])
    }

    fn allow_policy(id: &str, model: &str, condition: Condition) -> Policy {
        Policy {
            id: PolicyId::new(id),
            model: model.to_string(),
            action: ActionScope::One(Action::Read),
            effect: Effect::Allow,
            priority: 0,
            condition,
        }
    }

    #[test]
    fn valid_policy_set_produces_no_errors() {
        let policies = vec![Policy::baseline("colleges", Action::Read)];
        let errors = validate_policies(
            &policies,
            &registry_with_colleges(),
            &PolicyLimits::default(),
        );
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn duplicate_ids_detected() {
        let policies = vec![
            allow_policy("p1", "colleges", Condition::Always),
            allow_policy("p1", "colleges", Condition::Always),
        ];
        let errors = validate_policies(
            &policies,
            &registry_with_colleges(),
            &PolicyLimits::default(),
        );
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::DuplicatePolicyId { id } if id == "p1"))
        );
    }

    #[test]
    fn unknown_model_detected() {
        let policies = vec![allow_policy("p1", "invoices", Condition::Always)];
        let errors = validate_policies(
            &policies,
            &registry_with_colleges(),
            &PolicyLimits::default(),
        );
        assert!(errors.iter().any(
            |e| matches!(e, ValidationError::UnknownModel { model, .. } if model == "invoices")
        ));
    }

    #[test]
    fn unknown_field_detected_when_fields_declared() {
        let condition = Condition::compare(
            AttrRef::resource("tenant"),
            CompareOp::Eq,
            Operand::Value(AttrValue::from("x")),
        );
        let policies = vec![allow_policy("p1", "colleges", condition)];
        let errors = validate_policies(
            &policies,
            &registry_with_colleges(),
            &PolicyLimits::default(),
        );
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::UnknownField { field, .. } if field == "tenant"))
        );
    }

    #[test]
    fn undeclared_fields_allow_any_reference() {
        let registry = ModelRegistry::from_descriptors(vec![ModelDescriptor {
            name: "colleges".to_string(),
            fields: vec![],
        }]);
        let condition = Condition::compare(
            AttrRef::resource("anything"),
            CompareOp::Eq,
            Operand::Value(AttrValue::from("x")),
        );
        let policies = vec![allow_policy("p1", "colleges", condition)];
        let errors = validate_policies(&policies, &registry, &PolicyLimits::default());
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn condition_depth_limit_enforced() {
        let mut condition = Condition::Always;
        for _ in 0..10 {
            condition = Condition::Not {
                not: Box::new(condition),
            };
        }
        let policies = vec![allow_policy("p1", "colleges", condition)];
        let limits = PolicyLimits {
            max_condition_depth: 4,
            ..Default::default()
        };
        let errors = validate_policies(&policies, &registry_with_colleges(), &limits);
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::ConditionTooDeep { limit: 4, .. }))
        );
    }

    #[test]
    fn per_scope_limit_counts_wildcard_toward_each_action() {
        let mut policies = vec![allow_policy("specific", "colleges", Condition::Always)];
        policies.push(Policy {
            id: PolicyId::new("wild"),
            model: "colleges".to_string(),
            action: ActionScope::Any,
            effect: Effect::Allow,
            priority: 0,
            condition: Condition::Always,
        });
        let limits = PolicyLimits {
            max_policies_per_scope: 1,
            ..Default::default()
        };
        let errors = validate_policies(&policies, &registry_with_colleges(), &limits);
        // colleges.read has two applicable policies; the other three
        // actions have one each (the wildcard).
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::TooManyPolicies {
                action: Action::Read,
                count: 2,
                ..
            }
        )));
    }
}
