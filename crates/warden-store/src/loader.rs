use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use warden_core::policy::{Policy, PolicyLimits, ValidationError, validate_policies};
use warden_core::registry::{ModelDescriptor, ModelRegistry};

/// A policy file: the model catalog plus the policy set, authored as
/// TOML. The file is the unit of replacement; a reload installs the
/// whole set or nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyFile {
    #[serde(rename = "model", default)]
    pub models: Vec<ModelDescriptor>,
    #[serde(rename = "policy", default)]
    pub policies: Vec<Policy>,
}

impl PolicyFile {
    pub fn registry(&self) -> ModelRegistry {
        ModelRegistry::from_descriptors(self.models.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read policy file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("policy file {path} is invalid: {}", errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },
}

/// Read, parse, and validate a policy file. Validation failures reject
/// the whole file so a bad edit can never half-install.
pub fn load_policy_file(path: &Path, limits: &PolicyLimits) -> Result<PolicyFile, LoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: PolicyFile = toml::from_str(&raw).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;

    let registry = file.registry();
    let errors = validate_policies(&file.policies, &registry, limits);
    if !errors.is_empty() {
        return Err(LoadError::Invalid {
            path: path.to_path_buf(),
            errors,
        });
    }

    info!(
        path = %path.display(),
        models = file.models.len(),
        policies = file.policies.len(),
        "loaded policy file"
    );
    Ok(file)
}
