use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PrincipalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action '{0}', expected create|read|update|delete")]
pub struct ActionParseError(String);

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(ActionParseError(other.to_string())),
        }
    }
}

/// The action scope a policy targets: one verb or the `*` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActionScope {
    Any,
    One(Action),
}

impl ActionScope {
    pub fn covers(&self, action: Action) -> bool {
        match self {
            ActionScope::Any => true,
            ActionScope::One(a) => *a == action,
        }
    }
}

impl fmt::Display for ActionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionScope::Any => f.write_str("*"),
            ActionScope::One(a) => a.fmt(f),
        }
    }
}

impl TryFrom<String> for ActionScope {
    type Error = ActionParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == "*" {
            return Ok(ActionScope::Any);
        }
        Ok(ActionScope::One(s.parse()?))
    }
}

impl From<ActionScope> for String {
    fn from(scope: ActionScope) -> Self {
        scope.to_string()
    }
}

/// A permission key of the form `<model>.<action>`, e.g. `colleges.read`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey {
    pub model: String,
    pub action: Action,
}

impl PermissionKey {
    pub fn new(model: impl Into<String>, action: Action) -> Self {
        Self {
            model: model.into(),
            action,
        }
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.model, self.action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed permission key '{0}', expected <model>.<action>")]
pub struct PermissionKeyError(String);

impl FromStr for PermissionKey {
    type Err = PermissionKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (model, action) = s
            .rsplit_once('.')
            .ok_or_else(|| PermissionKeyError(s.to_string()))?;
        if model.is_empty() {
            return Err(PermissionKeyError(s.to_string()));
        }
        let action = action
            .parse()
            .map_err(|_| PermissionKeyError(s.to_string()))?;
        Ok(Self {
            model: model.to_string(),
            action,
        })
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = PermissionKeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PermissionKey> for String {
    fn from(key: PermissionKey) -> Self {
        key.to_string()
    }
}

/// The authenticated actor. Built once per request from verified
/// credentials and immutable for the request's duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    #[serde(default)]
    pub permissions: Vec<PermissionKey>,
    #[serde(default)]
    pub super_admin: bool,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: PrincipalId::new(id),
            permissions: Vec::new(),
            super_admin: false,
        }
    }

    pub fn super_admin(id: impl Into<String>) -> Self {
        Self {
            id: PrincipalId::new(id),
            permissions: Vec::new(),
            super_admin: true,
        }
    }

    pub fn with_permissions(mut self, permissions: Vec<PermissionKey>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn has_permission(&self, model: &str, action: Action) -> bool {
        self.permissions
            .iter()
            .any(|k| k.model == model && k.action == action)
    }
}
