//! Authorization orchestrator.
//!
//! [`FhirAuthorizationEngine`] ties the pieces together for one call: fetch
//! the caller's permissions, compile them, and hand the rules to the
//! evaluator. Nothing is cached between calls.

use std::sync::Arc;

use tracing::instrument;

use crate::PermissionResult;
use crate::error::PermissionError;
use crate::evaluator::PermissionEvaluator;
use crate::model::{
    FhirRequest, FhirResponse, PermissionContext, PermissionRule, RequestEvaluationResult,
};
use crate::service::PermissionService;

/// Authorizes requests and filters responses against FHIR Permissions.
#[derive(Clone)]
pub struct FhirAuthorizationEngine {
    permission_service: Arc<dyn PermissionService>,
    evaluator: Arc<PermissionEvaluator>,
}

impl FhirAuthorizationEngine {
    #[must_use]
    pub fn new(
        permission_service: Arc<dyn PermissionService>,
        evaluator: Arc<PermissionEvaluator>,
    ) -> Self {
        Self {
            permission_service,
            evaluator,
        }
    }

    /// The evaluator shared by every call.
    pub fn evaluator(&self) -> &PermissionEvaluator {
        &self.evaluator
    }

    /// Fetches and compiles the rules that apply to `context`.
    ///
    /// # Errors
    ///
    /// Propagates permission service failures.
    pub fn rules_for(&self, context: &PermissionContext) -> PermissionResult<Vec<PermissionRule>> {
        let permissions = self.permission_service.get_permissions(context)?;
        Ok(self.evaluator.compile_rules(&permissions))
    }

    /// Evaluates a request, returning the decision and the scoped search
    /// parameters.
    ///
    /// # Errors
    ///
    /// Propagates permission service failures. A refusal is not an error
    /// here; see [`Self::authorize_request`].
    #[instrument(
        skip(self, context, request),
        fields(user_id = %context.user_id(), resource_type = %request.resource_type)
    )]
    pub fn evaluate_request(
        &self,
        context: &PermissionContext,
        request: &FhirRequest,
    ) -> PermissionResult<RequestEvaluationResult> {
        let rules = self.rules_for(context)?;
        let operation = request.operation();

        let allowed = self
            .evaluator
            .can_perform(&request.resource_type, operation, &rules);
        let modified_search_parameters = self.evaluator.update_search_parameters(
            &request.resource_type,
            Some(&request.search_parameters),
            &rules,
        );

        tracing::debug!(%operation, allowed, rule_count = rules.len(), "Evaluated request");

        Ok(RequestEvaluationResult::new(
            allowed,
            modified_search_parameters,
            rules,
        ))
    }

    /// Like [`Self::evaluate_request`], but a refusal is an error.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::NotAllowed`] if the rules refuse the request.
    pub fn authorize_request(
        &self,
        context: &PermissionContext,
        request: &FhirRequest,
    ) -> PermissionResult<RequestEvaluationResult> {
        let result = self.evaluate_request(context, request)?;
        if !result.allowed {
            tracing::info!(
                user_id = %context.user_id(),
                resource_type = %request.resource_type,
                operation = %request.operation(),
                "Request refused by permissions"
            );
            return Err(PermissionError::not_allowed(
                request.resource_type.clone(),
                request.operation(),
            ));
        }
        Ok(result)
    }

    /// Redacts a response with the caller's current rules.
    ///
    /// # Errors
    ///
    /// Propagates permission service failures.
    #[instrument(skip(self, context, response), fields(user_id = %context.user_id(), status = response.status_code))]
    pub fn filter_response(
        &self,
        context: &PermissionContext,
        response: FhirResponse,
    ) -> PermissionResult<FhirResponse> {
        let rules = self.rules_for(context)?;
        Ok(self.evaluator.filter_response(response, &rules))
    }
}

impl std::fmt::Debug for FhirAuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FhirAuthorizationEngine")
            .field("evaluator", &self.evaluator)
            .finish_non_exhaustive()
    }
}
