use serde::{Deserialize, Serialize};

use crate::context::{AttrValue, EvaluationContext};

/// An attribute reference: which side of the evaluation context a
/// condition reads from, and the attribute name within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrRef {
    Subject(String),
    Resource(String),
    Environment(String),
}

impl AttrRef {
    pub fn subject(name: impl Into<String>) -> Self {
        AttrRef::Subject(name.into())
    }

    pub fn resource(name: impl Into<String>) -> Self {
        AttrRef::Resource(name.into())
    }

    pub fn environment(name: impl Into<String>) -> Self {
        AttrRef::Environment(name.into())
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, AttrRef::Resource(_))
    }
}

/// The right-hand side of a comparison: a literal value or another
/// attribute (e.g. `resource.owner_id == subject.id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Attr(AttrRef),
    Value(AttrValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    In,
    Contains,
    StartsWith,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compare {
    pub left: AttrRef,
    pub op: CompareOp,
    pub right: Operand,
}

impl Compare {
    pub fn new(left: AttrRef, op: CompareOp, right: Operand) -> Self {
        Self { left, op, right }
    }
}

/// A policy condition as data: a small tagged expression tree with a
/// single total interpreter. A missing attribute makes a comparison
/// false, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Always,
    Compare(Compare),
    All { of: Vec<Condition> },
    Any { of: Vec<Condition> },
    Not { not: Box<Condition> },
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Always
    }
}

impl Condition {
    pub fn compare(left: AttrRef, op: CompareOp, right: Operand) -> Self {
        Condition::Compare(Compare::new(left, op, right))
    }

    pub fn matches(&self, ctx: &EvaluationContext) -> bool {
        match self {
            Condition::Always => true,
            Condition::Compare(cmp) => eval_compare(cmp, ctx),
            Condition::All { of } => of.iter().all(|c| c.matches(ctx)),
            Condition::Any { of } => of.iter().any(|c| c.matches(ctx)),
            Condition::Not { not } => !not.matches(ctx),
        }
    }

    /// Whether any comparison in this tree reads a resource attribute.
    /// Conditions that don't are resource-independent and can gate
    /// collection-level (list) operations.
    pub fn references_resource(&self) -> bool {
        match self {
            Condition::Always => false,
            Condition::Compare(cmp) => {
                cmp.left.is_resource()
                    || matches!(&cmp.right, Operand::Attr(r) if r.is_resource())
            }
            Condition::All { of } | Condition::Any { of } => {
                of.iter().any(Condition::references_resource)
            }
            Condition::Not { not } => not.references_resource(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Condition::Always | Condition::Compare(_) => 1,
            Condition::All { of } | Condition::Any { of } => {
                1 + of.iter().map(Condition::depth).max().unwrap_or(0)
            }
            Condition::Not { not } => 1 + not.depth(),
        }
    }

    /// Resource attribute names mentioned anywhere in the tree.
    pub fn resource_fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_resource_fields(&mut fields);
        fields
    }

    fn collect_resource_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Always => {}
            Condition::Compare(cmp) => {
                if let AttrRef::Resource(field) = &cmp.left {
                    out.push(field);
                }
                if let Operand::Attr(AttrRef::Resource(field)) = &cmp.right {
                    out.push(field);
                }
            }
            Condition::All { of } | Condition::Any { of } => {
                for c in of {
                    c.collect_resource_fields(out);
                }
            }
            Condition::Not { not } => not.collect_resource_fields(out),
        }
    }
}

fn resolve<'a>(attr: &AttrRef, ctx: &'a EvaluationContext) -> Option<&'a AttrValue> {
    match attr {
        AttrRef::Subject(name) => ctx.subject_attr(name),
        AttrRef::Resource(name) => ctx.resource_attr(name),
        AttrRef::Environment(name) => ctx.environment_attr(name),
    }
}

fn eval_compare(cmp: &Compare, ctx: &EvaluationContext) -> bool {
    let Some(left) = resolve(&cmp.left, ctx) else {
        return false;
    };
    let right = match &cmp.right {
        Operand::Value(v) => v,
        Operand::Attr(attr) => match resolve(attr, ctx) {
            Some(v) => v,
            None => return false,
        },
    };

    match cmp.op {
        CompareOp::Eq => left == right,
        CompareOp::Ne => left != right,
        CompareOp::In => right.as_list().is_some_and(|items| items.contains(left)),
        CompareOp::Contains => match left {
            AttrValue::List(items) => items.contains(right),
            AttrValue::Str(s) => right.as_str().is_some_and(|needle| s.contains(needle)),
            _ => false,
        },
        CompareOp::StartsWith => match (left.as_str(), right.as_str()) {
            (Some(l), Some(r)) => l.starts_with(r),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AttrMap, RequestMeta, ResourceAttrs};
    use crate::principal::{Action, PermissionKey, Principal};

    fn ctx_with_resource(resource_attrs: AttrMap) -> EvaluationContext {
        let principal = Principal::new("alice")
            .with_permissions(vec![PermissionKey::new("colleges", Action::Read)]);
        let meta = RequestMeta {
            client_addr: Some("10.0.0.1".to_string()),
            ..Default::default()
        };
        EvaluationContext::build(&principal, &meta)
            .with_resource(ResourceAttrs::new("colleges", resource_attrs))
    }

    fn owner_eq_subject_id() -> Condition {
        Condition::compare(
            AttrRef::resource("owner_id"),
            CompareOp::Eq,
            Operand::Attr(AttrRef::subject("id")),
        )
    }

    #[test]
    fn always_matches_any_context() {
        let ctx = ctx_with_resource(AttrMap::new());
        assert!(Condition::Always.matches(&ctx));
    }

    #[test]
    fn compare_eq_literal() {
        let ctx = ctx_with_resource(AttrMap::from([(
            "status".to_string(),
            AttrValue::from("active"),
        )]));
        let cond = Condition::compare(
            AttrRef::resource("status"),
            CompareOp::Eq,
            Operand::Value(AttrValue::from("active")),
        );
        assert!(cond.matches(&ctx));
    }

    #[test]
    fn compare_eq_across_attributes() {
        let ctx = ctx_with_resource(AttrMap::from([(
            "owner_id".to_string(),
            AttrValue::from("alice"),
        )]));
        assert!(owner_eq_subject_id().matches(&ctx));

        let other = ctx_with_resource(AttrMap::from([(
            "owner_id".to_string(),
            AttrValue::from("bob"),
        )]));
        assert!(!owner_eq_subject_id().matches(&other));
    }

    #[test]
    fn missing_attribute_fails_comparison_not_evaluation() {
        let ctx = ctx_with_resource(AttrMap::new());
        let cond = Condition::compare(
            AttrRef::resource("status"),
            CompareOp::Eq,
            Operand::Value(AttrValue::from("active")),
        );
        assert!(!cond.matches(&ctx));
    }

    #[test]
    fn missing_attribute_makes_ne_false_too() {
        // Ne over a missing attribute is false, not true: the interpreter
        // never derives a positive result from an absent attribute.
        let ctx = ctx_with_resource(AttrMap::new());
        let cond = Condition::compare(
            AttrRef::resource("status"),
            CompareOp::Ne,
            Operand::Value(AttrValue::from("archived")),
        );
        assert!(!cond.matches(&ctx));
    }

    #[test]
    fn in_checks_membership_of_left_in_right_list() {
        let ctx = ctx_with_resource(AttrMap::from([(
            "status".to_string(),
            AttrValue::from("draft"),
        )]));
        let cond = Condition::compare(
            AttrRef::resource("status"),
            CompareOp::In,
            Operand::Value(AttrValue::List(vec![
                AttrValue::from("draft"),
                AttrValue::from("active"),
            ])),
        );
        assert!(cond.matches(&ctx));
    }

    #[test]
    fn in_with_non_list_right_is_false() {
        let ctx = ctx_with_resource(AttrMap::from([(
            "status".to_string(),
            AttrValue::from("draft"),
        )]));
        let cond = Condition::compare(
            AttrRef::resource("status"),
            CompareOp::In,
            Operand::Value(AttrValue::from("draft")),
        );
        assert!(!cond.matches(&ctx));
    }

    #[test]
    fn contains_on_subject_permission_list() {
        let ctx = ctx_with_resource(AttrMap::new());
        let cond = Condition::compare(
            AttrRef::subject("permissions"),
            CompareOp::Contains,
            Operand::Value(AttrValue::from("colleges.read")),
        );
        assert!(cond.matches(&ctx));

        let absent = Condition::compare(
            AttrRef::subject("permissions"),
            CompareOp::Contains,
            Operand::Value(AttrValue::from("colleges.delete")),
        );
        assert!(!absent.matches(&ctx));
    }

    #[test]
    fn starts_with_on_environment_addr() {
        let ctx = ctx_with_resource(AttrMap::new());
        let cond = Condition::compare(
            AttrRef::environment("client_addr"),
            CompareOp::StartsWith,
            Operand::Value(AttrValue::from("10.")),
        );
        assert!(cond.matches(&ctx));
    }

    #[test]
    fn all_requires_every_branch() {
        let ctx = ctx_with_resource(AttrMap::from([(
            "owner_id".to_string(),
            AttrValue::from("alice"),
        )]));
        let both = Condition::All {
            of: vec![owner_eq_subject_id(), Condition::Always],
        };
        assert!(both.matches(&ctx));

        let failing = Condition::All {
            of: vec![
                owner_eq_subject_id(),
                Condition::compare(
                    AttrRef::resource("status"),
                    CompareOp::Eq,
                    Operand::Value(AttrValue::from("active")),
                ),
            ],
        };
        assert!(!failing.matches(&ctx));
    }

    #[test]
    fn any_requires_one_branch() {
        let ctx = ctx_with_resource(AttrMap::from([(
            "status".to_string(),
            AttrValue::from("active"),
        )]));
        let cond = Condition::Any {
            of: vec![
                owner_eq_subject_id(),
                Condition::compare(
                    AttrRef::resource("status"),
                    CompareOp::Eq,
                    Operand::Value(AttrValue::from("active")),
                ),
            ],
        };
        assert!(cond.matches(&ctx));
    }

    #[test]
    fn not_inverts() {
        let ctx = ctx_with_resource(AttrMap::new());
        let cond = Condition::Not {
            not: Box::new(Condition::Always),
        };
        assert!(!cond.matches(&ctx));
    }

    #[test]
    fn references_resource_detects_left_and_right_refs() {
        assert!(owner_eq_subject_id().references_resource());

        let subject_only = Condition::compare(
            AttrRef::subject("permissions"),
            CompareOp::Contains,
            Operand::Value(AttrValue::from("colleges.read")),
        );
        assert!(!subject_only.references_resource());

        let right_ref = Condition::compare(
            AttrRef::subject("id"),
            CompareOp::Eq,
            Operand::Attr(AttrRef::resource("owner_id")),
        );
        assert!(right_ref.references_resource());

        let nested = Condition::Not {
            not: Box::new(Condition::Any {
                of: vec![owner_eq_subject_id()],
            }),
        };
        assert!(nested.references_resource());
    }

    #[test]
    fn depth_counts_nesting() {
        assert_eq!(Condition::Always.depth(), 1);
        assert_eq!(owner_eq_subject_id().depth(), 1);
        let nested = Condition::All {
            of: vec![Condition::Any {
                of: vec![Condition::Always],
            }],
        };
        assert_eq!(nested.depth(), 3);
    }

    #[test]
    fn resource_fields_collects_mentions() {
        let cond = Condition::All {
            of: vec![
                owner_eq_subject_id(),
                Condition::compare(
                    AttrRef::subject("id"),
                    CompareOp::Eq,
                    Operand::Attr(AttrRef::resource("created_by")),
                ),
            ],
        };
        assert_eq!(cond.resource_fields(), vec!["owner_id", "created_by"]);
    }

    #[test]
    fn condition_deserializes_from_tagged_json() {
        let cond: Condition = serde_json::from_str(
            r#"{
                "type": "all",
                "of": [
                    {"type": "compare", "left": {"resource": "owner_id"}, "op": "eq", "right": {"subject": "id"}},
                    {"type": "compare", "left": {"resource": "status"}, "op": "eq", "right": "active"}
                ]
            }"#,
        )
        .unwrap();

        let expected = Condition::All {
            of: vec![
                owner_eq_subject_id(),
                Condition::compare(
                    AttrRef::resource("status"),
                    CompareOp::Eq,
                    Operand::Value(AttrValue::from("active")),
                ),
            ],
        };
        assert_eq!(cond, expected);
    }
}
