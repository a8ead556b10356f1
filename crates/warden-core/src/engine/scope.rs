use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::context::{AttrMap, AttrValue, EvaluationContext};
use crate::policy::{AttrRef, CompareOp, Condition, Effect, Operand};
use crate::principal::{Action, Principal};

use super::{EvaluateError, PolicyReader};

/// How one compiled constraint restricts a resource field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintOp {
    Eq,
    In,
}

/// One field restriction in a scope filter, with the right-hand side
/// already resolved to a concrete value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConstraint {
    pub field: String,
    pub op: ConstraintOp,
    pub value: AttrValue,
}

impl FieldConstraint {
    pub fn eq(field: impl Into<String>, value: AttrValue) -> Self {
        Self {
            field: field.into(),
            op: ConstraintOp::Eq,
            value,
        }
    }

    pub fn one_of(field: impl Into<String>, values: Vec<AttrValue>) -> Self {
        Self {
            field: field.into(),
            op: ConstraintOp::In,
            value: AttrValue::List(values),
        }
    }

    fn matches(&self, attrs: &AttrMap) -> bool {
        let Some(actual) = attrs.get(&self.field) else {
            return false;
        };
        match self.op {
            ConstraintOp::Eq => actual == &self.value,
            ConstraintOp::In => self.value.as_list().is_some_and(|vs| vs.contains(actual)),
        }
    }
}

/// A declarative row filter: the union (OR) of constraint groups, each
/// group a conjunction (AND) over fields. An empty `any_of` means no
/// restriction at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScopeFilter {
    pub any_of: Vec<Vec<FieldConstraint>>,
}

impl ScopeFilter {
    pub fn is_unrestricted(&self) -> bool {
        self.any_of.is_empty()
    }

    pub fn matches(&self, attrs: &AttrMap) -> bool {
        self.any_of.is_empty()
            || self
                .any_of
                .iter()
                .any(|group| group.iter().all(|c| c.matches(attrs)))
    }
}

/// The collection-level outcome: whether the principal may touch the
/// model at all, and if so which rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataScope {
    pub has_access: bool,
    pub filter: ScopeFilter,
}

impl DataScope {
    pub fn denied() -> Self {
        Self {
            has_access: false,
            filter: ScopeFilter::default(),
        }
    }

    pub fn unrestricted() -> Self {
        Self {
            has_access: true,
            filter: ScopeFilter::default(),
        }
    }

    pub fn restricted(filter: ScopeFilter) -> Self {
        Self {
            has_access: true,
            filter,
        }
    }

    pub fn permits(&self, attrs: &AttrMap) -> bool {
        self.has_access && self.filter.matches(attrs)
    }
}

/// Compiles the applicable allow policies into a [`DataScope`] for list
/// operations, without loading any rows. Shares the policy reader with
/// the item-level evaluator.
pub struct ScopeResolver<R: PolicyReader> {
    reader: Arc<R>,
}

impl<R: PolicyReader> ScopeResolver<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    /// Resolve the data scope for `principal` listing `model` rows.
    ///
    /// Matched resource-independent denies kill access to the whole
    /// model. Each remaining allow whose non-resource conjuncts match
    /// the context contributes one constraint group; a policy whose
    /// resource constraints cannot be compiled contributes nothing
    /// (fail-closed per policy). An allow with no resource constraints
    /// makes the scope unrestricted. The resulting filter is the union
    /// of the per-policy groups.
    pub async fn resolve(
        &self,
        principal: &Principal,
        model: &str,
        action: Action,
        context: &EvaluationContext,
    ) -> Result<DataScope, EvaluateError> {
        if principal.super_admin {
            return Ok(DataScope::unrestricted());
        }

        let policies = self.reader.read_policies(model, action).await?;

        // Denies first: a matched deny that does not depend on resource
        // attributes removes access to every row of the model.
        for policy in policies.iter().filter(|p| p.effect == Effect::Deny) {
            let (gate, resource) = split_conjuncts(&policy.condition);
            if !resource.is_empty() {
                // Resource-dependent denies only apply item by item.
                debug!(policy = %policy.id, "skipping row-level deny in scope resolution");
                continue;
            }
            if gate.iter().all(|c| c.matches(context)) {
                return Ok(DataScope::denied());
            }
        }

        let mut groups: Vec<Vec<FieldConstraint>> = Vec::new();
        let mut unrestricted = false;

        for policy in policies.iter().filter(|p| p.effect == Effect::Allow) {
            let (gate, resource) = split_conjuncts(&policy.condition);
            if !gate.iter().all(|c| c.matches(context)) {
                continue;
            }
            if resource.is_empty() {
                unrestricted = true;
                continue;
            }
            match compile_group(&resource, context) {
                Some(group) if group.is_empty() => unrestricted = true,
                Some(group) => groups.push(group),
                None => {
                    // Not expressible as a filter; the policy grants
                    // nothing at collection level rather than too much.
                    debug!(policy = %policy.id, "allow policy not compilable to a scope filter");
                }
            }
        }

        if unrestricted {
            return Ok(DataScope::unrestricted());
        }
        if groups.is_empty() {
            return Ok(DataScope::denied());
        }
        Ok(DataScope::restricted(ScopeFilter { any_of: groups }))
    }
}

/// Split a condition into top-level conjuncts and partition them into
/// the gate part (no resource references) and the resource part. `All`
/// nodes are flattened; any other node is a single conjunct.
fn split_conjuncts(condition: &Condition) -> (Vec<&Condition>, Vec<&Condition>) {
    let mut gate = Vec::new();
    let mut resource = Vec::new();
    collect_conjuncts(condition, &mut gate, &mut resource);
    (gate, resource)
}

fn collect_conjuncts<'a>(
    condition: &'a Condition,
    gate: &mut Vec<&'a Condition>,
    resource: &mut Vec<&'a Condition>,
) {
    match condition {
        Condition::Always => {}
        Condition::All { of } => {
            for c in of {
                collect_conjuncts(c, gate, resource);
            }
        }
        other => {
            if other.references_resource() {
                resource.push(other);
            } else {
                gate.push(other);
            }
        }
    }
}

fn compile_group(conjuncts: &[&Condition], ctx: &EvaluationContext) -> Option<Vec<FieldConstraint>> {
    let mut group = Vec::new();
    for conjunct in conjuncts {
        group.extend(compile_condition(conjunct, ctx)?);
    }
    Some(group)
}

/// Compile one resource-referencing condition into field constraints.
/// Returns `None` whenever the condition cannot be expressed exactly as
/// a conjunction of Eq/In constraints with concrete values.
fn compile_condition(condition: &Condition, ctx: &EvaluationContext) -> Option<Vec<FieldConstraint>> {
    match condition {
        Condition::Always => Some(Vec::new()),
        Condition::Compare(cmp) => compile_compare(cmp, ctx).map(|c| vec![c]),
        Condition::All { of } => {
            let mut out = Vec::new();
            for c in of {
                out.extend(compile_condition(c, ctx)?);
            }
            Some(out)
        }
        // An Any over single Eq constraints on one field folds into In;
        // anything more general has no exact filter form.
        Condition::Any { of } => {
            let mut field: Option<String> = None;
            let mut values = Vec::new();
            for branch in of {
                let mut compiled = compile_condition(branch, ctx)?;
                if compiled.len() != 1 {
                    return None;
                }
                let constraint = compiled.remove(0);
                if constraint.op != ConstraintOp::Eq {
                    return None;
                }
                match &field {
                    None => field = Some(constraint.field),
                    Some(f) if *f == constraint.field => {}
                    Some(_) => return None,
                }
                values.push(constraint.value);
            }
            let field = field?;
            Some(vec![FieldConstraint::one_of(field, values)])
        }
        Condition::Not { .. } => None,
    }
}

fn compile_compare(
    cmp: &crate::policy::Compare,
    ctx: &EvaluationContext,
) -> Option<FieldConstraint> {
    let AttrRef::Resource(field) = &cmp.left else {
        return None;
    };
    let value = match &cmp.right {
        Operand::Value(v) => v.clone(),
        Operand::Attr(AttrRef::Resource(_)) => return None,
        Operand::Attr(attr) => resolve_attr(attr, ctx)?.clone(),
    };
    match cmp.op {
        CompareOp::Eq => Some(FieldConstraint::eq(field.clone(), value)),
        CompareOp::In => match value {
            AttrValue::List(items) => Some(FieldConstraint::one_of(field.clone(), items)),
            _ => None,
        },
        CompareOp::Ne | CompareOp::Contains | CompareOp::StartsWith => None,
    }
}

fn resolve_attr<'a>(attr: &AttrRef, ctx: &'a EvaluationContext) -> Option<&'a AttrValue> {
    match attr {
        AttrRef::Subject(name) => ctx.subject_attr(name),
        AttrRef::Environment(name) => ctx.environment_attr(name),
        AttrRef::Resource(_) => None,
    }
}
