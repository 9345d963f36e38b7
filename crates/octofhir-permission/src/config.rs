//! Permission engine configuration.
//!
//! The configuration is built once, validated, and handed to the evaluator,
//! matcher and redaction engine by reference. Nothing in this crate reads
//! global state.
//!
//! # Example (TOML)
//!
//! ```toml
//! [languages]
//! path = "text/fhirpath"
//! query = "application/x-fhir-query"
//!
//! [document]
//! collection_type = "Bundle"
//!
//! [search]
//! common_parameters = true
//!
//! [fhir]
//! version = "R4"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Root configuration for the permission engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Expression languages recognized in `Permission.rule.data.expression`.
    pub languages: LanguageConfig,

    /// Document model settings.
    pub document: DocumentConfig,

    /// Search parameter catalogue settings.
    pub search: SearchConfig,

    /// FHIR release used to resolve types during path evaluation.
    pub fhir: FhirConfig,
}

/// Expression languages that the rule compiler recognizes.
///
/// Expressions in any other language are dropped during compilation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Language of deny-side path expressions (fields to redact).
    pub path: String,

    /// Language of allow-side search fragments (query scoping).
    pub query: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            path: "text/fhirpath".to_string(),
            query: "application/x-fhir-query".to_string(),
        }
    }
}

/// Document model configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Resource type of collection documents whose entries are redacted
    /// independently.
    pub collection_type: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            collection_type: "Bundle".to_string(),
        }
    }
}

/// Search parameter catalogue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Register the built-in token search parameters (`_id`, `identifier`,
    /// `code`, ...) when building the default catalogue.
    pub common_parameters: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            common_parameters: true,
        }
    }
}

/// FHIR release settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FhirConfig {
    /// One of `R4`, `R4B`, `R5`, `R6`.
    pub version: String,
}

/// Releases with embedded schemas.
pub const SUPPORTED_FHIR_VERSIONS: [&str; 4] = ["R4", "R4B", "R5", "R6"];

fn default_fhir_version() -> String {
    "R4".into()
}

impl Default for FhirConfig {
    fn default() -> Self {
        Self {
            version: default_fhir_version(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration file {path}: {message}")]
    Io {
        /// Path of the file.
        path: String,
        /// Description of the I/O failure.
        message: String,
    },

    /// The configuration file is not valid TOML.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl PermissionConfig {
    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::InvalidValue` when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise the
    /// errors of [`PermissionConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - either expression language is empty
    /// - both languages are the same (allow and deny data would be ambiguous)
    /// - the collection type is empty
    /// - the FHIR version has no embedded schemas
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.languages.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "languages.path cannot be empty".to_string(),
            ));
        }

        if self.languages.query.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "languages.query cannot be empty".to_string(),
            ));
        }

        if self.languages.path == self.languages.query {
            return Err(ConfigError::InvalidValue(format!(
                "languages.path and languages.query must differ (both '{}')",
                self.languages.path
            )));
        }

        if self.document.collection_type.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "document.collection_type cannot be empty".to_string(),
            ));
        }

        if !SUPPORTED_FHIR_VERSIONS.contains(&self.fhir.version.as_str()) {
            return Err(ConfigError::InvalidValue(format!(
                "fhir.version '{}' is not one of {}",
                self.fhir.version,
                SUPPORTED_FHIR_VERSIONS.join(", ")
            )));
        }

        Ok(())
    }
}
