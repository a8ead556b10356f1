use std::sync::Arc;

use crate::context::{EvaluationContext, ResourceAttrs};
use crate::decision::{Decision, PolicyTrace};
use crate::policy::Effect;
use crate::principal::{Action, Principal};

use super::{EvaluateError, PolicyReader};

/// The item-level decision core. Stateless apart from the shared policy
/// reader; safe to call concurrently.
pub struct Evaluator<R: PolicyReader> {
    reader: Arc<R>,
}

impl<R: PolicyReader> Evaluator<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    /// Decide whether `principal` may perform `action` on `resource`.
    ///
    /// Super-admins bypass evaluation entirely: no policy lookup occurs
    /// and the decision carries an empty trace. Otherwise policies for
    /// the resource's model+action are matched against the context and
    /// resolved deny-overrides-allow; with no match at all the default
    /// is deny. Identical inputs always yield the identical decision.
    pub async fn evaluate(
        &self,
        principal: &Principal,
        resource: &ResourceAttrs,
        action: Action,
        context: &EvaluationContext,
    ) -> Result<Decision, EvaluateError> {
        if principal.super_admin {
            return Ok(Decision::super_admin_bypass());
        }

        let policies = self.reader.read_policies(&resource.model, action).await?;
        let item_ctx = context.with_resource(resource.clone());

        let mut traces = Vec::with_capacity(policies.len());
        let mut best_deny: Option<usize> = None;
        let mut best_allow: Option<usize> = None;

        for (idx, policy) in policies.iter().enumerate() {
            let matched = policy.condition.matches(&item_ctx);
            if matched {
                let slot = match policy.effect {
                    Effect::Deny => &mut best_deny,
                    Effect::Allow => &mut best_allow,
                };
                // Highest priority wins; ties go to declaration order.
                let supersedes = match *slot {
                    None => true,
                    Some(prev) => policy.priority > policies[prev].priority,
                };
                if supersedes {
                    *slot = Some(idx);
                }
            }
            traces.push(PolicyTrace {
                policy_id: policy.id.clone(),
                effect: policy.effect,
                matched,
                decisive: false,
            });
        }

        let (effect, decisive) = match (best_deny, best_allow) {
            (Some(deny), _) => (Effect::Deny, Some(deny)),
            (None, Some(allow)) => (Effect::Allow, Some(allow)),
            (None, None) => (Effect::Deny, None),
        };
        if let Some(idx) = decisive {
            traces[idx].decisive = true;
        }

        Ok(Decision {
            effect,
            policies: traces,
        })
    }
}
