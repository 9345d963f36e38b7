//! Path evaluator capability.
//!
//! Redaction and criteria matching locate nodes through a [`PathEvaluator`].
//! [`FhirPathEngineEvaluator`] backs it with the `octofhir-fhirpath` engine
//! and the embedded FHIR schemas of the configured release.
//!
//! The engine is async while the permission core is synchronous, so the
//! adapter drives each evaluation to completion itself. Outside a Tokio
//! runtime it starts a private current-thread runtime on first use. Inside
//! one, the calling runtime must be multi-threaded.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use octofhir_fhirpath::{Collection, EvaluationContext, FhirPathEngine, ModelProvider};
use octofhir_fhirschema::{FhirSchemaModelProvider, embedded::get_schemas};
use serde_json::Value;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::PermissionResult;
use crate::config::FhirConfig;
use crate::error::PermissionError;

pub type SharedModelProvider = Arc<dyn ModelProvider + Send + Sync>;

/// Errors raised while evaluating a path expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The document could not be turned into an evaluation input.
    #[error("Failed to create FHIRPath input: {message}")]
    Input { message: String },

    /// The expression is malformed or failed during evaluation.
    #[error("FHIRPath evaluation of '{expression}' failed: {message}")]
    Evaluation { expression: String, message: String },
}

/// Evaluates path expressions against documents.
pub trait PathEvaluator: Send + Sync {
    /// Evaluates `expression` against `document`, returning the matched nodes
    /// in document order. Matched nodes are structurally comparable with the
    /// nodes of the document they came from.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] when the expression cannot be evaluated.
    fn evaluate(&self, document: &Value, expression: &str) -> Result<Vec<Value>, PathError>;
}

/// [`PathEvaluator`] over [`FhirPathEngine`].
pub struct FhirPathEngineEvaluator {
    engine: Arc<FhirPathEngine>,
    model_provider: SharedModelProvider,
    runtime: OnceLock<Runtime>,
}

impl FhirPathEngineEvaluator {
    /// Wraps an existing engine and the model provider it was built with.
    #[must_use]
    pub fn new(engine: Arc<FhirPathEngine>, model_provider: SharedModelProvider) -> Self {
        Self {
            engine,
            model_provider,
            runtime: OnceLock::new(),
        }
    }

    /// Builds an engine over the embedded schemas of `config.version`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for an unknown release or when the engine
    /// cannot be created.
    pub fn from_config(config: &FhirConfig) -> PermissionResult<Self> {
        let (schema_version, model_version) = match config.version.as_str() {
            "R4" => (
                octofhir_fhirschema::FhirVersion::R4,
                octofhir_fhir_model::FhirVersion::R4,
            ),
            "R4B" => (
                octofhir_fhirschema::FhirVersion::R4B,
                octofhir_fhir_model::FhirVersion::R4B,
            ),
            "R5" => (
                octofhir_fhirschema::FhirVersion::R5,
                octofhir_fhir_model::FhirVersion::R5,
            ),
            "R6" => (
                octofhir_fhirschema::FhirVersion::R6,
                octofhir_fhir_model::FhirVersion::R6,
            ),
            other => {
                return Err(PermissionError::configuration(format!(
                    "Unsupported FHIR version: {other}"
                )));
            }
        };

        let schemas = get_schemas(schema_version);
        let model_provider: SharedModelProvider =
            Arc::new(FhirSchemaModelProvider::new(schemas.clone(), model_version));
        let registry = Arc::new(octofhir_fhirpath::create_function_registry());

        let runtime = OnceLock::new();
        let engine = block_on(&runtime, FhirPathEngine::new(registry, model_provider.clone()))
            .map_err(|e| PermissionError::configuration(format!("Failed to start runtime: {e}")))?
            .map_err(|e| {
                PermissionError::configuration(format!("Failed to create FHIRPath engine: {e}"))
            })?;

        tracing::debug!(fhir_version = %config.version, "FHIRPath engine ready");
        Ok(Self {
            engine: Arc::new(engine),
            model_provider,
            runtime,
        })
    }

    pub fn engine(&self) -> &Arc<FhirPathEngine> {
        &self.engine
    }

    async fn evaluate_async(
        &self,
        document: &Value,
        expression: &str,
    ) -> Result<Vec<Value>, PathError> {
        let input = Collection::from_json_resource(document.clone(), Some(self.model_provider.clone()))
            .await
            .map_err(|e| PathError::Input {
                message: e.to_string(),
            })?;
        let context = EvaluationContext::new(input, self.model_provider.clone(), None, None, None);

        let result = self
            .engine
            .evaluate(expression, &context)
            .await
            .map_err(|e| PathError::Evaluation {
                expression: expression.to_string(),
                message: e.to_string(),
            })?;

        Ok(result.value.iter().map(|v| v.to_json_value()).collect())
    }
}

impl PathEvaluator for FhirPathEngineEvaluator {
    fn evaluate(&self, document: &Value, expression: &str) -> Result<Vec<Value>, PathError> {
        block_on(&self.runtime, self.evaluate_async(document, expression)).map_err(|e| {
            PathError::Evaluation {
                expression: expression.to_string(),
                message: format!("Failed to start runtime: {e}"),
            }
        })?
    }
}

impl std::fmt::Debug for FhirPathEngineEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FhirPathEngineEvaluator").finish_non_exhaustive()
    }
}

/// Runs `future` to completion from synchronous code.
///
/// The private runtime is only started when the caller is not already inside
/// a Tokio runtime.
fn block_on<F: Future>(runtime: &OnceLock<Runtime>, future: F) -> std::io::Result<F::Output> {
    if let Ok(handle) = Handle::try_current() {
        return Ok(tokio::task::block_in_place(|| handle.block_on(future)));
    }

    let runtime = match runtime.get() {
        Some(runtime) => runtime,
        None => {
            let built = Builder::new_current_thread().enable_all().build()?;
            runtime.get_or_init(|| built)
        }
    };
    Ok(runtime.block_on(future))
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evaluator() -> FhirPathEngineEvaluator {
        FhirPathEngineEvaluator::from_config(&FhirConfig::default()).unwrap()
    }

    #[test]
    fn test_engine_evaluates_where_clause() {
        let patient = json!({
            "resourceType": "Patient",
            "telecom": [
                { "system": "phone", "value": "123456" },
                { "system": "email", "value": "mail@mail.mail" }
            ]
        });

        let matches = evaluator()
            .evaluate(&patient, "Patient.telecom.where(system='email')")
            .unwrap();
        assert_eq!(matches, vec![json!({ "system": "email", "value": "mail@mail.mail" })]);
    }

    #[test]
    fn test_engine_reports_malformed_expression() {
        let err = evaluator()
            .evaluate(&json!({ "resourceType": "Patient" }), "telecom.where(")
            .unwrap_err();
        assert!(matches!(err, PathError::Evaluation { ref expression, .. } if expression == "telecom.where("));
    }

    #[test]
    fn test_unsupported_version() {
        let config = FhirConfig {
            version: "DSTU2".to_string(),
        };
        let err = FhirPathEngineEvaluator::from_config(&config).unwrap_err();
        assert!(matches!(err, PermissionError::Configuration { .. }));
    }
}
