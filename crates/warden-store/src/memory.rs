use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tracing::info;

use warden_core::context::AttrMap;
use warden_core::policy::Policy;
use warden_core::principal::Action;

use crate::traits::{PolicyStore, ResourceStore, StorageError};

/// One immutable, versioned policy set. Replaced wholesale, never
/// mutated in place, so concurrent reads always see a consistent set.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicySnapshot {
    pub version: u64,
    pub policies: Vec<Policy>,
}

impl PolicySnapshot {
    fn empty() -> Self {
        Self {
            version: 0,
            policies: Vec::new(),
        }
    }
}

/// In-memory policy store backed by an atomically swapped snapshot.
#[derive(Debug)]
pub struct InMemoryPolicyStore {
    snapshot: ArcSwap<PolicySnapshot>,
}

impl Default for InMemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(PolicySnapshot::empty()),
        }
    }

    pub fn with_policies(policies: Vec<Policy>) -> Self {
        let store = Self::new();
        store.replace_all(policies);
        store
    }

    /// Install `policies` as the new snapshot. In-flight reads keep the
    /// snapshot they loaded; new reads see the replacement. Returns the
    /// new version.
    pub fn replace_all(&self, policies: Vec<Policy>) -> u64 {
        let version = self.snapshot.load().version + 1;
        let count = policies.len();
        self.snapshot
            .store(Arc::new(PolicySnapshot { version, policies }));
        info!(version, count, "installed policy snapshot");
        version
    }

    pub fn current(&self) -> Arc<PolicySnapshot> {
        self.snapshot.load_full()
    }
}

impl PolicyStore for InMemoryPolicyStore {
    async fn policies_for(&self, model: &str, action: Action) -> Result<Vec<Policy>, StorageError> {
        let snapshot = self.snapshot.load();
        Ok(snapshot
            .policies
            .iter()
            .filter(|p| p.applies_to(model, action))
            .cloned()
            .collect())
    }

    async fn snapshot_version(&self) -> Result<u64, StorageError> {
        Ok(self.snapshot.load().version)
    }
}

/// In-memory resource rows keyed by `(model, id)`. Serves tests and the
/// demo server; a production deployment would back this with a database.
#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    rows: Mutex<HashMap<(String, String), AttrMap>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, model: impl Into<String>, id: impl Into<String>, attrs: AttrMap) {
        let mut rows = self.rows.lock().unwrap();
        rows.insert((model.into(), id.into()), attrs);
    }

    pub fn remove(&self, model: &str, id: &str) {
        let mut rows = self.rows.lock().unwrap();
        rows.remove(&(model.to_string(), id.to_string()));
    }
}

impl ResourceStore for InMemoryResourceStore {
    async fn fetch(&self, model: &str, id: &str) -> Result<Option<AttrMap>, StorageError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&(model.to_string(), id.to_string())).cloned())
    }

    async fn list(&self, model: &str) -> Result<Vec<(String, AttrMap)>, StorageError> {
        let rows = self.rows.lock().unwrap();
        let mut out: Vec<(String, AttrMap)> = rows
            .iter()
            .filter(|((m, _), _)| m == model)
            .map(|((_, id), attrs)| (id.clone(), attrs.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}
