//! Outcome of request evaluation.

use serde::Serialize;

use super::request::SearchParameters;
use super::rule::PermissionRule;

/// Result of evaluating a request against the caller's permissions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEvaluationResult {
    /// Whether the operation is permitted.
    pub allowed: bool,

    /// The request's search parameters with allow-rule scoping appended.
    pub modified_search_parameters: SearchParameters,

    /// The compiled rules the decision was made against.
    pub rules_applied: Vec<PermissionRule>,

    /// Non-fatal notes collected during evaluation.
    pub warnings: Vec<String>,
}

impl RequestEvaluationResult {
    #[must_use]
    pub fn new(
        allowed: bool,
        modified_search_parameters: SearchParameters,
        rules_applied: Vec<PermissionRule>,
    ) -> Self {
        Self {
            allowed,
            modified_search_parameters,
            rules_applied,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}
