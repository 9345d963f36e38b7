//! Criteria matching for single resources.
//!
//! Allow rules scope searches with fragments such as `identifier=sys|123`.
//! Reads bypass the search, so the same fragments are checked directly
//! against the returned resource. Only token criteria (`param=system|value`)
//! are understood; anything else is ignored with a warning and does not
//! filter the resource.
//!
//! A resource that fails a criterion is reported as [`PermissionError::NotFound`],
//! so callers cannot distinguish it from a resource that does not exist.
//!
//! Collections are matched as a whole: their own type rarely has rules, so
//! entries inside a Bundle are not checked.

use std::sync::Arc;

use serde_json::Value;

use crate::PermissionResult;
use crate::document::DocumentModel;
use crate::error::PermissionError;
use crate::fhirpath::PathEvaluator;
use crate::model::PermissionRule;
use crate::search_params::SearchParameterCatalog;

/// A parsed `param=system|value` criterion. Empty parts match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCriterion {
    pub parameter: String,
    pub system: String,
    pub value: String,
}

impl TokenCriterion {
    /// Parses a token criterion.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnsupportedCriteria`] if the text has no `=`
    /// or its value is not exactly `system|value`.
    pub fn parse(criterion: &str) -> PermissionResult<Self> {
        let Some((parameter, value)) = criterion.split_once('=') else {
            return Err(PermissionError::unsupported_criteria(criterion, "missing '='"));
        };

        let mut parts = value.trim().split('|');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(system), Some(value), None) => Ok(Self {
                parameter: parameter.trim().to_string(),
                system: system.to_string(),
                value: value.to_string(),
            }),
            _ => Err(PermissionError::unsupported_criteria(
                criterion,
                "expected a token in 'system|value' form",
            )),
        }
    }

    /// Returns `true` if any token-like node satisfies the criterion.
    #[must_use]
    pub fn matches_any(&self, nodes: &[Value]) -> bool {
        nodes.iter().any(|node| self.matches(node))
    }

    fn matches(&self, node: &Value) -> bool {
        match node {
            // Bare code, e.g. `Patient.gender`.
            Value::String(code) => self.system.is_empty() && self.value_matches(Some(code)),
            Value::Object(object) => {
                // CodeableConcept
                if let Some(Value::Array(codings)) = object.get("coding") {
                    return codings.iter().any(|coding| self.matches(coding));
                }
                // Identifier carries `value`, Coding carries `code`.
                let value = object
                    .get("value")
                    .or_else(|| object.get("code"))
                    .and_then(Value::as_str);
                let system = object.get("system").and_then(Value::as_str);
                self.system_matches(system) && self.value_matches(value)
            }
            _ => false,
        }
    }

    fn system_matches(&self, system: Option<&str>) -> bool {
        self.system.is_empty() || system == Some(self.system.as_str())
    }

    fn value_matches(&self, value: Option<&str>) -> bool {
        self.value.is_empty() || value == Some(self.value.as_str())
    }
}

/// Checks single resources against the search criteria of their rules.
#[derive(Clone)]
pub struct CriteriaMatcher {
    path_evaluator: Arc<dyn PathEvaluator>,
    catalog: Arc<dyn SearchParameterCatalog>,
    document_model: Arc<dyn DocumentModel>,
}

impl CriteriaMatcher {
    #[must_use]
    pub fn new(
        path_evaluator: Arc<dyn PathEvaluator>,
        catalog: Arc<dyn SearchParameterCatalog>,
        document_model: Arc<dyn DocumentModel>,
    ) -> Self {
        Self {
            path_evaluator,
            catalog,
            document_model,
        }
    }

    /// Succeeds if `document` satisfies every criterion of the rules for its
    /// type.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::NotFound`] if a criterion does not match.
    pub fn match_or_reject(&self, document: &Value, rules: &[PermissionRule]) -> PermissionResult<()> {
        let Some(resource_type) = self.document_model.resource_type(document) else {
            tracing::debug!("Document has no resource type, skipping criteria matching");
            return Ok(());
        };

        let criteria = rules
            .iter()
            .filter(|rule| rule.applies_to(resource_type))
            .flat_map(|rule| rule.search_expressions());

        for criterion in criteria {
            if !self.criterion_satisfied(document, resource_type, criterion) {
                tracing::debug!(resource_type, criterion = %criterion, "Resource does not match criterion");
                return Err(PermissionError::NotFound);
            }
        }
        Ok(())
    }

    /// Evaluates one criterion. Criteria that cannot be checked are treated as
    /// satisfied.
    fn criterion_satisfied(&self, document: &Value, resource_type: &str, criterion: &str) -> bool {
        let parsed = match TokenCriterion::parse(criterion) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring criterion");
                return true;
            }
        };

        let Some(expression) = self.catalog.resolve(resource_type, &parsed.parameter) else {
            let e = PermissionError::unsupported_criteria(
                criterion,
                format!("unknown search parameter '{}' for {resource_type}", parsed.parameter),
            );
            tracing::warn!(error = %e, "Ignoring criterion");
            return true;
        };

        match self.path_evaluator.evaluate(document, &expression) {
            Ok(nodes) => parsed.matches_any(&nodes),
            Err(source) => {
                let e = PermissionError::path_evaluation(expression, source);
                tracing::warn!(criterion = %criterion, error = %e, "Ignoring criterion");
                true
            }
        }
    }
}

impl std::fmt::Debug for CriteriaMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriteriaMatcher").finish_non_exhaustive()
    }
}
