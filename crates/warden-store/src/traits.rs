use warden_core::context::AttrMap;
use warden_core::policy::Policy;
use warden_core::principal::Action;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Read access to the installed policy snapshot. Reads never observe a
/// partially replaced policy set.
pub trait PolicyStore: Send + Sync {
    /// Policies applicable to `(model, action)`, wildcard-action
    /// policies included, in declaration order.
    fn policies_for(
        &self,
        model: &str,
        action: Action,
    ) -> impl Future<Output = Result<Vec<Policy>, StorageError>> + Send;

    fn snapshot_version(&self) -> impl Future<Output = Result<u64, StorageError>> + Send;
}

/// Read access to resource rows, keyed by model and id. The engine only
/// ever needs the attribute map of one row or of a model's row set.
pub trait ResourceStore: Send + Sync {
    fn fetch(
        &self,
        model: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<AttrMap>, StorageError>> + Send;

    fn list(
        &self,
        model: &str,
    ) -> impl Future<Output = Result<Vec<(String, AttrMap)>, StorageError>> + Send;
}
