//! Authorization evaluator.
//!
//! [`PermissionEvaluator`] holds the engine configuration and the injected
//! document-model and path-evaluator capabilities. It answers three questions
//! about a compiled rule set: may the operation proceed, how must the search
//! be scoped, and which fields must be stripped from the response.

use std::sync::Arc;

use serde_json::Value;

use crate::compiler;
use crate::config::PermissionConfig;
use crate::document::{DocumentModel, FhirJsonModel};
use crate::PermissionResult;
use crate::fhirpath::{FhirPathEngineEvaluator, PathEvaluator};
use crate::model::{FhirResponse, PermissionOperation, PermissionRule, SearchParameters};
use crate::redaction::RedactionEngine;

/// Evaluates compiled permission rules.
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    config: PermissionConfig,
    redaction: RedactionEngine,
}

impl PermissionEvaluator {
    /// Creates an evaluator from a configuration and its capabilities.
    #[must_use]
    pub fn new(
        config: PermissionConfig,
        document_model: Arc<dyn DocumentModel>,
        path_evaluator: Arc<dyn PathEvaluator>,
    ) -> Self {
        Self {
            config,
            redaction: RedactionEngine::new(document_model, path_evaluator),
        }
    }

    /// Creates an evaluator for FHIR JSON backed by the FHIRPath engine of
    /// the configured release.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the FHIRPath engine cannot be built.
    pub fn with_defaults(config: PermissionConfig) -> PermissionResult<Self> {
        let document_model = Arc::new(FhirJsonModel::from_config(&config.document));
        let path_evaluator = Arc::new(FhirPathEngineEvaluator::from_config(&config.fhir)?);
        Ok(Self::new(config, document_model, path_evaluator))
    }

    /// The configuration this evaluator was built with.
    pub fn config(&self) -> &PermissionConfig {
        &self.config
    }

    /// Compiles raw `Permission` resources with the configured languages.
    #[must_use]
    pub fn compile_rules(&self, permissions: &[Value]) -> Vec<PermissionRule> {
        compiler::compile_rules(permissions, &self.config.languages)
    }

    /// Decides whether `operation` on `resource_type` is permitted.
    ///
    /// With no rules at all the request is allowed. Otherwise any matching
    /// deny rule refuses it, and at least one matching allow rule is required.
    #[must_use]
    pub fn can_perform(
        &self,
        resource_type: &str,
        operation: PermissionOperation,
        rules: &[PermissionRule],
    ) -> bool {
        if rules.is_empty() {
            tracing::debug!(resource_type, %operation, "No permission rules, allowing");
            return true;
        }

        if rules.iter().any(|rule| rule.denies(resource_type, operation)) {
            tracing::debug!(resource_type, %operation, "Denied by permission rule");
            return false;
        }

        let allowed = rules.iter().any(|rule| rule.allows(resource_type, operation));
        if !allowed {
            tracing::debug!(resource_type, %operation, "No permission rule allows operation");
        }
        allowed
    }

    /// Returns `original` with the search fragments of every allow rule
    /// appended.
    ///
    /// Values are appended, never replacing what the caller sent, so the
    /// rewritten search can only narrow the result set.
    #[must_use]
    pub fn update_search_parameters(
        &self,
        resource_type: &str,
        original: Option<&SearchParameters>,
        rules: &[PermissionRule],
    ) -> SearchParameters {
        let mut parameters = original.cloned().unwrap_or_default();

        for rule in rules.iter().filter(|rule| rule.is_allow()) {
            for expression in rule.search_expressions() {
                append_search_expression(&mut parameters, expression);
            }
        }

        tracing::trace!(resource_type, parameters = ?parameters, "Scoped search parameters");
        parameters
    }

    /// Strips the fields named by the rules' blacklist expressions from the
    /// response body. The status code is left untouched.
    #[must_use]
    pub fn filter_response(&self, mut response: FhirResponse, rules: &[PermissionRule]) -> FhirResponse {
        let expressions: Vec<String> = rules
            .iter()
            .flat_map(|rule| rule.blacklist_expressions().iter().cloned())
            .collect();

        if let Some(resource) = response.resource.as_mut() {
            self.redaction.remove_fields_by_expression(resource, &expressions);
        }
        response
    }

    /// The redaction engine applying blacklist expressions.
    pub fn redaction(&self) -> &RedactionEngine {
        &self.redaction
    }
}

/// Appends the parameters of one `key=v1,v2&key2=v3` fragment.
///
/// Fragments without `=` or with an empty value are ignored.
pub fn append_search_expression(parameters: &mut SearchParameters, expression: &str) {
    for fragment in expression.split('&') {
        let Some((key, value)) = fragment.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        parameters
            .entry(key.to_string())
            .or_default()
            .extend(value.split(',').map(str::to_string));
    }
}
