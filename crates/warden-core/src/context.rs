use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// An attribute value: the small vocabulary conditions compare over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<AttrValue>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Int(n)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

/// Attribute maps are ordered so evaluation is deterministic.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// Request-adjacent metadata the environment attributes are built from.
/// All fields are optional; absent fields simply produce no attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestMeta {
    pub method: Option<String>,
    pub path: Option<String>,
    pub client_addr: Option<String>,
    pub user_agent: Option<String>,
    pub query: BTreeMap<String, String>,
}

/// The target entity's field values, tagged with its model name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAttrs {
    pub model: String,
    pub attrs: AttrMap,
}

impl ResourceAttrs {
    pub fn new(model: impl Into<String>, attrs: AttrMap) -> Self {
        Self {
            model: model.into(),
            attrs,
        }
    }
}

/// Subject, resource, and environment attributes for one evaluation.
/// Immutable once built; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext {
    subject: AttrMap,
    resource: Option<ResourceAttrs>,
    environment: AttrMap,
}

impl EvaluationContext {
    /// Assemble a context from the principal and request metadata. Pure
    /// transformation; the resource slot starts empty and is attached
    /// with [`EvaluationContext::with_resource`] for item-level checks.
    pub fn build(principal: &Principal, meta: &RequestMeta) -> Self {
        let mut subject = AttrMap::new();
        subject.insert("id".to_string(), AttrValue::from(principal.id.as_str()));
        subject.insert(
            "super_admin".to_string(),
            AttrValue::Bool(principal.super_admin),
        );
        subject.insert(
            "permissions".to_string(),
            AttrValue::List(
                principal
                    .permissions
                    .iter()
                    .map(|k| AttrValue::Str(k.to_string()))
                    .collect(),
            ),
        );

        let mut environment = AttrMap::new();
        if let Some(ref method) = meta.method {
            environment.insert("method".to_string(), AttrValue::from(method.as_str()));
        }
        if let Some(ref path) = meta.path {
            environment.insert("path".to_string(), AttrValue::from(path.as_str()));
        }
        if let Some(ref addr) = meta.client_addr {
            environment.insert("client_addr".to_string(), AttrValue::from(addr.as_str()));
        }
        if let Some(ref agent) = meta.user_agent {
            environment.insert("user_agent".to_string(), AttrValue::from(agent.as_str()));
        }
        for (name, value) in &meta.query {
            environment.insert(format!("query.{name}"), AttrValue::from(value.as_str()));
        }

        Self {
            subject,
            resource: None,
            environment,
        }
    }

    pub fn with_resource(&self, resource: ResourceAttrs) -> Self {
        Self {
            subject: self.subject.clone(),
            resource: Some(resource),
            environment: self.environment.clone(),
        }
    }

    pub fn subject_attr(&self, name: &str) -> Option<&AttrValue> {
        self.subject.get(name)
    }

    pub fn resource_attr(&self, name: &str) -> Option<&AttrValue> {
        self.resource.as_ref().and_then(|r| r.attrs.get(name))
    }

    pub fn environment_attr(&self, name: &str) -> Option<&AttrValue> {
        self.environment.get(name)
    }

    pub fn resource(&self) -> Option<&ResourceAttrs> {
        self.resource.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::{Action, PermissionKey};

    fn meta_with_method(method: &str) -> RequestMeta {
        RequestMeta {
            method: Some(method.to_string()),
            ..Default::default()
        }
    }

    // --- AttrValue ---

    #[test]
    fn attr_value_untagged_json_shapes() {
        assert_eq!(
            serde_json::from_str::<AttrValue>("\"active\"").unwrap(),
            AttrValue::from("active")
        );
        assert_eq!(
            serde_json::from_str::<AttrValue>("42").unwrap(),
            AttrValue::Int(42)
        );
        assert_eq!(
            serde_json::from_str::<AttrValue>("true").unwrap(),
            AttrValue::Bool(true)
        );
        assert_eq!(
            serde_json::from_str::<AttrValue>("[\"a\", \"b\"]").unwrap(),
            AttrValue::List(vec![AttrValue::from("a"), AttrValue::from("b")])
        );
    }

    // --- EvaluationContext ---

    #[test]
    fn build_populates_subject_attributes() {
        let principal = Principal::new("u1")
            .with_permissions(vec![PermissionKey::new("colleges", Action::Read)]);
        let ctx = EvaluationContext::build(&principal, &RequestMeta::default());

        assert_eq!(ctx.subject_attr("id"), Some(&AttrValue::from("u1")));
        assert_eq!(ctx.subject_attr("super_admin"), Some(&AttrValue::Bool(false)));
        assert_eq!(
            ctx.subject_attr("permissions"),
            Some(&AttrValue::List(vec![AttrValue::from("colleges.read")]))
        );
    }

    #[test]
    fn build_populates_environment_from_meta() {
        let meta = RequestMeta {
            method: Some("GET".to_string()),
            path: Some("/colleges".to_string()),
            client_addr: Some("10.0.0.1".to_string()),
            user_agent: Some("curl/8".to_string()),
            query: BTreeMap::from([("page".to_string(), "2".to_string())]),
        };
        let ctx = EvaluationContext::build(&Principal::new("u1"), &meta);

        assert_eq!(ctx.environment_attr("method"), Some(&AttrValue::from("GET")));
        assert_eq!(
            ctx.environment_attr("path"),
            Some(&AttrValue::from("/colleges"))
        );
        assert_eq!(
            ctx.environment_attr("client_addr"),
            Some(&AttrValue::from("10.0.0.1"))
        );
        assert_eq!(
            ctx.environment_attr("user_agent"),
            Some(&AttrValue::from("curl/8"))
        );
        assert_eq!(
            ctx.environment_attr("query.page"),
            Some(&AttrValue::from("2"))
        );
    }

    #[test]
    fn absent_meta_fields_produce_no_attributes() {
        let ctx = EvaluationContext::build(&Principal::new("u1"), &meta_with_method("GET"));

        assert_eq!(ctx.environment_attr("path"), None);
        assert_eq!(ctx.environment_attr("client_addr"), None);
        assert_eq!(ctx.environment_attr("user_agent"), None);
    }

    #[test]
    fn context_starts_without_resource() {
        let ctx = EvaluationContext::build(&Principal::new("u1"), &RequestMeta::default());
        assert!(ctx.resource().is_none());
        assert_eq!(ctx.resource_attr("status"), None);
    }

    #[test]
    fn with_resource_attaches_resource_attributes() {
        let ctx = EvaluationContext::build(&Principal::new("u1"), &RequestMeta::default());
        let resource = ResourceAttrs::new(
            "colleges",
            AttrMap::from([("status".to_string(), AttrValue::from("active"))]),
        );

        let item_ctx = ctx.with_resource(resource);

        assert_eq!(
            item_ctx.resource_attr("status"),
            Some(&AttrValue::from("active"))
        );
        assert_eq!(item_ctx.resource().unwrap().model, "colleges");
        // Original context untouched.
        assert!(ctx.resource().is_none());
    }

    #[test]
    fn build_is_deterministic() {
        let principal = Principal::new("u1").with_permissions(vec![
            PermissionKey::new("colleges", Action::Read),
            PermissionKey::new("departments", Action::Update),
        ]);
        let meta = meta_with_method("POST");

        let a = EvaluationContext::build(&principal, &meta);
        let b = EvaluationContext::build(&principal, &meta);

        assert_eq!(a, b);
    }
}
