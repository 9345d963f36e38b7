//! Response redaction.
//!
//! Deny-side rules name fields with path expressions. The [`RedactionEngine`]
//! evaluates each expression against the outgoing document and removes every
//! matched node, locating it by a depth-first walk over the field catalogue
//! of the [`DocumentModel`].

use std::sync::Arc;

use serde_json::Value;

use crate::document::DocumentModel;
use crate::fhirpath::PathEvaluator;

/// Removes path-selected nodes from documents.
#[derive(Clone)]
pub struct RedactionEngine {
    document_model: Arc<dyn DocumentModel>,
    path_evaluator: Arc<dyn PathEvaluator>,
}

impl RedactionEngine {
    #[must_use]
    pub fn new(
        document_model: Arc<dyn DocumentModel>,
        path_evaluator: Arc<dyn PathEvaluator>,
    ) -> Self {
        Self {
            document_model,
            path_evaluator,
        }
    }

    /// Removes every node selected by `expressions` from `document`.
    ///
    /// Collections are redacted entry by entry, each entry being evaluated as
    /// its own document. Expressions that fail to evaluate are logged and
    /// skipped. Returns the number of nodes removed.
    pub fn remove_fields_by_expression(&self, document: &mut Value, expressions: &[String]) -> usize {
        if expressions.is_empty() {
            return 0;
        }

        if self.document_model.is_collection(document) {
            return self
                .document_model
                .collection_entries_mut(document)
                .into_iter()
                .map(|entry| self.remove_fields_by_expression(entry, expressions))
                .sum();
        }

        let mut removed = 0;
        for expression in expressions {
            let matches = match self.path_evaluator.evaluate(document, expression) {
                Ok(matches) => matches,
                Err(e) => {
                    tracing::error!(
                        expression = %expression,
                        error = %e,
                        "Failed to evaluate redaction expression, skipping"
                    );
                    continue;
                }
            };

            for matched in &matches {
                if self.remove_element(document, matched) {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            tracing::debug!(
                resource_type = self.document_model.resource_type(document).unwrap_or("<unknown>"),
                removed,
                "Redacted document"
            );
        }
        removed
    }

    /// Removes the first node structurally equal to `target` from the subtree
    /// rooted at `node`.
    ///
    /// Fields are visited in catalogue order, which for FHIR JSON is document
    /// order. Each field's own values are compared before descending into
    /// them, so a match at a shallower depth within a field wins over one
    /// nested inside it. A composite child left without fields is removed as
    /// well. Returns `false` if no such node exists.
    pub fn remove_element(&self, node: &mut Value, target: &Value) -> bool {
        let Some(fields) = self.document_model.field_catalog(node) else {
            return false;
        };

        for field in &fields {
            let position = self
                .document_model
                .field_values(node, field)
                .iter()
                .position(|value| *value == target);

            if let Some(index) = position {
                return self.document_model.remove_value(node, field, index);
            }

            let mut emptied = None;
            for (index, child) in self
                .document_model
                .field_values_mut(node, field)
                .into_iter()
                .enumerate()
            {
                if self.document_model.is_composite(child) && self.remove_element(child, target) {
                    emptied = Some(self.document_model.is_empty(child).then_some(index));
                    break;
                }
            }

            if let Some(emptied) = emptied {
                if let Some(index) = emptied {
                    self.document_model.remove_value(node, field, index);
                }
                return true;
            }
        }

        false
    }
}

impl std::fmt::Debug for RedactionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedactionEngine").finish_non_exhaustive()
    }
}
