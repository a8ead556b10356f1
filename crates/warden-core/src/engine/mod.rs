mod evaluate;
mod scope;

pub use evaluate::Evaluator;
pub use scope::{ConstraintOp, DataScope, FieldConstraint, ScopeFilter, ScopeResolver};

use crate::policy::Policy;
use crate::principal::Action;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The policy lookup could not complete. Callers must treat this as
    /// fail-closed: the request is denied, never allowed by default.
    #[error("policy store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Read access to the policy set. Implementations return the ordered
/// policies applicable to `(model, action)`, including wildcard-action
/// policies for that model; the returned order is the declaration order.
pub trait PolicyReader: Send + Sync {
    fn read_policies(
        &self,
        model: &str,
        action: Action,
    ) -> impl Future<Output = Result<Vec<Policy>, EvaluateError>> + Send;
}
