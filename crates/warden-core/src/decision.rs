use serde::Serialize;

use crate::policy::{Effect, PolicyId};

/// One considered policy: whether its condition matched, and whether it
/// was the one that determined the outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyTrace {
    pub policy_id: PolicyId,
    pub effect: Effect,
    pub matched: bool,
    pub decisive: bool,
}

/// The evaluator's output: the final effect plus the ordered list of
/// policies considered. At most one trace entry is decisive; an empty
/// list with `Allow` is the super-admin bypass, an empty list with
/// `Deny` is the secure default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub effect: Effect,
    pub policies: Vec<PolicyTrace>,
}

impl Decision {
    pub fn super_admin_bypass() -> Self {
        Self {
            effect: Effect::Allow,
            policies: Vec::new(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }

    pub fn decisive(&self) -> Option<&PolicyTrace> {
        self.policies.iter().find(|t| t.decisive)
    }

    /// Matched traces only, for denial payloads: unmatched policies are
    /// not disclosed to callers.
    pub fn matched(&self) -> Vec<PolicyTrace> {
        self.policies.iter().filter(|t| t.matched).cloned().collect()
    }
}
