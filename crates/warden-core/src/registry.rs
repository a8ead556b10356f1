use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::EvaluateError;

/// A typed resource descriptor registered at startup. Replaces any
/// runtime lookup of models by string name: unknown names are rejected
/// up front rather than resolved reflectively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    /// Declared resource fields, usable in policy conditions and scope
    /// filters. Empty means undeclared (no field-level validation).
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelDescriptor>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_descriptors(descriptors: Vec<ModelDescriptor>) -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor);
        }
        registry
    }

    pub fn register(&mut self, descriptor: ModelDescriptor) {
        self.models.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&ModelDescriptor, EvaluateError> {
        self.models
            .get(name)
            .ok_or_else(|| EvaluateError::InvalidInput(format!("unknown model '{name}'")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
