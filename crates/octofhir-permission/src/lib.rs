//! # octofhir-permission
//!
//! FHIR `Permission` based authorization for the OctoFHIR server.
//!
//! This crate provides:
//! - Compilation of `Permission` resources into evaluation-ready rules
//! - Deny-overrides authorization of REST requests
//! - Search scoping with allow-rule query fragments
//! - Criteria matching of single resources against those fragments
//! - Response redaction driven by path expressions
//!
//! ## Overview
//!
//! A caller's permissions are fetched and compiled on every call, so policy
//! changes take effect immediately. Documents are handled as FHIR JSON
//! through two pluggable capabilities: a [`DocumentModel`] describing each
//! node's fields, and a [`PathEvaluator`] selecting nodes by expression.
//!
//! ## Modules
//!
//! - [`config`] - Engine configuration (languages, document model, catalogue, FHIR release)
//! - [`fhirpath`] - Path evaluation over the FHIRPath engine
//! - [`model`] - Rules, operations, requests and results
//! - [`resources`] - The FHIR `Permission` resource
//! - [`compiler`] - `Permission` to rule compilation
//! - [`evaluator`] - Authorization decisions, search scoping and redaction
//! - [`matcher`] - Criteria matching of single resources
//! - [`redaction`] - Field removal by path expression
//! - [`engine`] - Per-call orchestration
//! - [`facade`] - String-level API for non-Rust hosts

pub mod compiler;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod facade;
pub mod fhirpath;
pub mod matcher;
pub mod model;
pub mod redaction;
pub mod resources;
pub mod search_params;
pub mod service;

pub use config::{
    ConfigError, DocumentConfig, FhirConfig, LanguageConfig, PermissionConfig, SearchConfig,
};
pub use document::{Cardinality, DocumentModel, FhirJsonModel, FieldDescriptor};
pub use engine::FhirAuthorizationEngine;
pub use error::{ErrorCategory, PermissionError};
pub use evaluator::PermissionEvaluator;
pub use facade::{PermissionFacade, parse_search_parameters, to_query_string};
pub use fhirpath::{FhirPathEngineEvaluator, PathError, PathEvaluator, SharedModelProvider};
pub use matcher::{CriteriaMatcher, TokenCriterion};
pub use model::{
    FhirRequest, FhirResponse, HttpVerb, PermissionContext, PermissionOperation, PermissionRule,
    RequestEvaluationResult, SearchParameters, WILDCARD_RESOURCE_TYPE,
};
pub use redaction::RedactionEngine;
pub use resources::Permission;
pub use search_params::{SearchParameterCatalog, StaticSearchParameterCatalog};
pub use service::{PermissionService, StaticPermissionService};

/// Type alias for permission engine results.
pub type PermissionResult<T> = Result<T, PermissionError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use octofhir_permission::prelude::*;
/// ```
pub mod prelude {
    pub use crate::PermissionResult;
    pub use crate::config::{FhirConfig, PermissionConfig};
    pub use crate::document::{DocumentModel, FhirJsonModel};
    pub use crate::engine::FhirAuthorizationEngine;
    pub use crate::error::{ErrorCategory, PermissionError};
    pub use crate::evaluator::PermissionEvaluator;
    pub use crate::facade::PermissionFacade;
    pub use crate::fhirpath::{FhirPathEngineEvaluator, PathError, PathEvaluator};
    pub use crate::matcher::CriteriaMatcher;
    pub use crate::model::{
        FhirRequest, FhirResponse, HttpVerb, PermissionContext, PermissionOperation,
        PermissionRule, RequestEvaluationResult, SearchParameters,
    };
    pub use crate::search_params::{SearchParameterCatalog, StaticSearchParameterCatalog};
    pub use crate::service::{PermissionService, StaticPermissionService};
}
