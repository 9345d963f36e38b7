//! Requests and responses seen by the engine.

use indexmap::IndexMap;
use serde_json::Value;

use super::operation::{HttpVerb, PermissionOperation};

/// Search parameters keyed by name, each with its ordered values.
///
/// Insertion order is preserved so rewritten queries stay stable.
pub type SearchParameters = IndexMap<String, Vec<String>>;

/// A FHIR REST request to authorize.
#[derive(Debug, Clone, PartialEq)]
pub struct FhirRequest {
    pub method: HttpVerb,
    pub resource_type: String,
    pub resource_id: Option<String>,
    /// Name of a `$operation`, when the request invokes one.
    pub operation_name: Option<String>,
    pub search_parameters: SearchParameters,
    /// Request payload for create/update/patch.
    pub body: Option<Value>,
}

impl FhirRequest {
    /// Creates a request with no id, operation, parameters or body.
    #[must_use]
    pub fn new(method: HttpVerb, resource_type: impl Into<String>) -> Self {
        Self {
            method,
            resource_type: resource_type.into(),
            resource_id: None,
            operation_name: None,
            search_parameters: SearchParameters::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    #[must_use]
    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    #[must_use]
    pub fn with_search_parameters(mut self, search_parameters: SearchParameters) -> Self {
        self.search_parameters = search_parameters;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Derives the operation being requested from the verb and request shape.
    #[must_use]
    pub fn operation(&self) -> PermissionOperation {
        match self.method {
            HttpVerb::Get if self.resource_id.is_some() => PermissionOperation::Read,
            HttpVerb::Get => PermissionOperation::Search,
            HttpVerb::Post if self.operation_name.is_some() => PermissionOperation::Custom,
            HttpVerb::Post => PermissionOperation::Create,
            HttpVerb::Put => PermissionOperation::Update,
            HttpVerb::Patch => PermissionOperation::Patch,
            HttpVerb::Delete => PermissionOperation::Delete,
        }
    }
}

/// A FHIR REST response to filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FhirResponse {
    pub status_code: u16,
    /// A single resource or a Bundle.
    pub resource: Option<Value>,
}

impl FhirResponse {
    #[must_use]
    pub fn new(status_code: u16, resource: Option<Value>) -> Self {
        Self {
            status_code,
            resource,
        }
    }
}
