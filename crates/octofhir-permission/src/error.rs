//! Permission engine error types.
//!
//! This module defines the errors surfaced by rule evaluation, resource
//! matching and the string-level facade. Some kinds (unsupported criteria,
//! path evaluation failures) never escape the engine: they are logged and
//! the offending criterion or expression is skipped.

use std::fmt;

use crate::config::ConfigError;
use crate::fhirpath::PathError;

/// Errors that can occur while authorizing a request or filtering a response.
#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    /// The engine or a request is misconfigured (e.g. an unknown HTTP verb).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The compiled rules refuse the requested operation.
    #[error("Not allowed: {operation} on {resource_type}")]
    NotAllowed {
        /// The resource type the request targeted.
        resource_type: String,
        /// The refused operation.
        operation: String,
    },

    /// The resource does not satisfy the permission criteria.
    ///
    /// Deliberately worded like a missing resource so callers cannot tell a
    /// filtered resource apart from a nonexistent one.
    #[error("Could not find resource")]
    NotFound,

    /// A match criterion could not be interpreted.
    #[error("Unsupported criteria '{criteria}': {message}")]
    UnsupportedCriteria {
        /// The raw criterion text.
        criteria: String,
        /// Why the criterion was rejected.
        message: String,
    },

    /// A path expression failed to evaluate.
    #[error("Path evaluation failed for '{expression}': {source}")]
    PathEvaluation {
        /// The expression that failed.
        expression: String,
        /// The underlying evaluator error.
        #[source]
        source: PathError,
    },

    /// A collaborator (permission storage, remote evaluator) failed.
    #[error("External service error: {service} - {message}")]
    ExternalService {
        /// The failing service.
        service: String,
        /// Description of the failure.
        message: String,
    },

    /// A resource or permission document could not be parsed.
    #[error("Invalid resource: {message}")]
    InvalidResource {
        /// Description of the parse failure.
        message: String,
    },
}

impl PermissionError {
    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `NotAllowed` error.
    #[must_use]
    pub fn not_allowed(resource_type: impl Into<String>, operation: impl fmt::Display) -> Self {
        Self::NotAllowed {
            resource_type: resource_type.into(),
            operation: operation.to_string(),
        }
    }

    /// Creates a new `UnsupportedCriteria` error.
    #[must_use]
    pub fn unsupported_criteria(criteria: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedCriteria {
            criteria: criteria.into(),
            message: message.into(),
        }
    }

    /// Creates a new `PathEvaluation` error.
    #[must_use]
    pub fn path_evaluation(expression: impl Into<String>, source: PathError) -> Self {
        Self::PathEvaluation {
            expression: expression.into(),
            source,
        }
    }

    /// Creates a new `ExternalService` error.
    #[must_use]
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidResource` error.
    #[must_use]
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            message: message.into(),
        }
    }

    /// Returns `true` if the error is a refusal rather than a failure.
    #[must_use]
    pub fn is_refusal(&self) -> bool {
        matches!(self, Self::NotAllowed { .. } | Self::NotFound)
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::NotAllowed { .. } => ErrorCategory::Authorization,
            Self::NotFound => ErrorCategory::Authorization,
            Self::UnsupportedCriteria { .. } => ErrorCategory::Validation,
            Self::PathEvaluation { .. } => ErrorCategory::Validation,
            Self::ExternalService { .. } => ErrorCategory::Infrastructure,
            Self::InvalidResource { .. } => ErrorCategory::Validation,
        }
    }

    /// Returns the HTTP status an adapter should answer with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotAllowed { .. } => 403,
            Self::NotFound => 404,
            Self::InvalidResource { .. } | Self::UnsupportedCriteria { .. } => 400,
            Self::PathEvaluation { .. } => 400,
            Self::ExternalService { .. } => 502,
            Self::Configuration { .. } => 500,
        }
    }
}

impl From<ConfigError> for PermissionError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

/// Categories of permission errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Access refusals.
    Authorization,
    /// Malformed input (criteria, expressions, documents).
    Validation,
    /// Failing collaborators.
    Infrastructure,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
