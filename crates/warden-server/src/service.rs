use std::sync::Arc;

use warden_core::context::{EvaluationContext, RequestMeta, ResourceAttrs};
use warden_core::decision::Decision;
use warden_core::engine::{DataScope, Evaluator, ScopeResolver};
use warden_core::principal::{Action, Principal};
use warden_core::registry::ModelRegistry;
use warden_store::{PolicyStore, ResourceStore};

use crate::adapter::StorePolicyReader;
use crate::audit;
use crate::error::ApiError;
use crate::metrics::Metrics;

/// What a passed item check hands to the downstream handler. The
/// resource is absent only on the super-admin bypass, which skips the
/// fetch entirely.
#[derive(Debug, Clone)]
pub struct ItemGrant {
    pub resource: Option<ResourceAttrs>,
    pub decision: Decision,
}

/// The access decision front door: one evaluation per request, every
/// outcome audited. Generic over the two storage seams so tests can
/// substitute failing stores.
pub struct AccessService<P: PolicyStore, R: ResourceStore> {
    evaluator: Evaluator<StorePolicyReader<P>>,
    resolver: ScopeResolver<StorePolicyReader<P>>,
    resources: Arc<R>,
    registry: Arc<ModelRegistry>,
    metrics: Option<Arc<Metrics>>,
}

impl<P: PolicyStore, R: ResourceStore> AccessService<P, R> {
    pub fn new(policies: Arc<P>, resources: Arc<R>, registry: Arc<ModelRegistry>) -> Self {
        let reader = Arc::new(StorePolicyReader::new(policies));
        Self {
            evaluator: Evaluator::new(Arc::clone(&reader)),
            resolver: ScopeResolver::new(reader),
            resources,
            registry,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Evaluate `principal` acting on one resource. Unknown models are
    /// rejected before anything else; a missing resource is NotFound
    /// before any policy work. Returns the decision either way; callers
    /// that gate requests use [`AccessService::authorize_item`].
    pub async fn evaluate_item(
        &self,
        principal: &Principal,
        model: &str,
        resource_id: &str,
        action: Action,
        meta: &RequestMeta,
    ) -> Result<ItemGrant, ApiError> {
        self.registry.require(model)?;

        if principal.super_admin {
            let decision = Decision::super_admin_bypass();
            audit::audit_decision(
                &audit::new_decision_id(),
                &principal.id,
                model,
                action,
                Some(resource_id),
                &decision,
            );
            self.record_decision(true);
            return Ok(ItemGrant {
                resource: None,
                decision,
            });
        }

        let attrs = match self.resources.fetch(model, resource_id).await {
            Ok(attrs) => attrs,
            Err(e) => {
                self.record_store_error();
                audit::audit_store_failure(&principal.id, model, action, &e.to_string());
                return Err(e.into());
            }
        };
        let Some(attrs) = attrs else {
            return Err(ApiError::NotFound);
        };
        let resource = ResourceAttrs::new(model, attrs);

        let context = EvaluationContext::build(principal, meta);
        let decision = match self
            .evaluator
            .evaluate(principal, &resource, action, &context)
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                self.record_store_error();
                audit::audit_store_failure(&principal.id, model, action, &e.to_string());
                return Err(e.into());
            }
        };

        audit::audit_decision(
            &audit::new_decision_id(),
            &principal.id,
            model,
            action,
            Some(resource_id),
            &decision,
        );
        self.record_decision(decision.is_allowed());

        Ok(ItemGrant {
            resource: Some(resource),
            decision,
        })
    }

    /// Like [`AccessService::evaluate_item`] but turns a deny into
    /// `AccessDenied` carrying the matched traces.
    pub async fn authorize_item(
        &self,
        principal: &Principal,
        model: &str,
        resource_id: &str,
        action: Action,
        meta: &RequestMeta,
    ) -> Result<ItemGrant, ApiError> {
        let grant = self
            .evaluate_item(principal, model, resource_id, action, meta)
            .await?;
        if !grant.decision.is_allowed() {
            return Err(ApiError::AccessDenied {
                matched: grant.decision.matched(),
            });
        }
        Ok(grant)
    }

    /// Resolve the row filter for a collection operation.
    pub async fn resolve_scope(
        &self,
        principal: &Principal,
        model: &str,
        action: Action,
        meta: &RequestMeta,
    ) -> Result<DataScope, ApiError> {
        self.registry.require(model)?;

        let context = EvaluationContext::build(principal, meta);
        let scope = match self
            .resolver
            .resolve(principal, model, action, &context)
            .await
        {
            Ok(scope) => scope,
            Err(e) => {
                self.record_store_error();
                audit::audit_store_failure(&principal.id, model, action, &e.to_string());
                return Err(e.into());
            }
        };

        audit::audit_scope_resolution(
            &audit::new_decision_id(),
            &principal.id,
            model,
            action,
            &scope,
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_scope_resolution();
        }

        Ok(scope)
    }

    /// Gate a collection operation: deny with an empty trace list when
    /// no allow survives scope resolution.
    pub async fn authorize_collection(
        &self,
        principal: &Principal,
        model: &str,
        action: Action,
        meta: &RequestMeta,
    ) -> Result<DataScope, ApiError> {
        let scope = self.resolve_scope(principal, model, action, meta).await?;
        if !scope.has_access {
            return Err(ApiError::AccessDenied { matched: Vec::new() });
        }
        Ok(scope)
    }

    fn record_decision(&self, allowed: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_decision(allowed);
        }
    }

    fn record_store_error(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_store_error();
        }
    }
}
