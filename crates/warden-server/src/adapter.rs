use std::sync::Arc;

use warden_core::engine::{EvaluateError, PolicyReader};
use warden_core::policy::Policy;
use warden_core::principal::Action;
use warden_store::PolicyStore;

/// Bridges the storage layer to the engine's [`PolicyReader`] seam, so
/// the engine stays ignorant of storage error types.
pub struct StorePolicyReader<S: PolicyStore> {
    store: Arc<S>,
}

impl<S: PolicyStore> StorePolicyReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: PolicyStore> PolicyReader for StorePolicyReader<S> {
    async fn read_policies(&self, model: &str, action: Action) -> Result<Vec<Policy>, EvaluateError> {
        self.store
            .policies_for(model, action)
            .await
            .map_err(|e| EvaluateError::StoreUnavailable(e.to_string()))
    }
}
