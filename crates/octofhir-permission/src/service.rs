//! Permission retrieval.
//!
//! The engine asks a [`PermissionService`] for the `Permission` resources that
//! apply to the caller on every call, so a service backed by storage always
//! reflects current policy.

use std::path::Path;

use serde_json::Value;

use crate::PermissionResult;
use crate::error::PermissionError;
use crate::model::PermissionContext;

/// Source of permission declarations for a caller.
pub trait PermissionService: Send + Sync {
    /// Returns the raw `Permission` resources that apply to `context`.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::ExternalService`] when the backing store
    /// cannot be reached.
    fn get_permissions(&self, context: &PermissionContext) -> PermissionResult<Vec<Value>>;
}

/// A service returning the same fixed set of permissions to every caller.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissionService {
    permissions: Vec<Value>,
}

impl StaticPermissionService {
    #[must_use]
    pub fn new(permissions: Vec<Value>) -> Self {
        Self { permissions }
    }

    /// A service with no permissions; every request is allowed.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a service from JSON holding a single resource, an array of
    /// resources, or a Bundle of them.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::InvalidResource`] if the text is not JSON or
    /// not one of the accepted shapes.
    pub fn from_json_str(json: &str) -> PermissionResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| PermissionError::invalid_resource(format!("Invalid permission JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Same as [`Self::from_json_str`], reading from a file.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::Configuration`] if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> PermissionResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PermissionError::configuration(format!(
                "Failed to read permissions from {}: {e}",
                path.display()
            ))
        })?;
        let service = Self::from_json_str(&content)?;
        tracing::info!(
            path = %path.display(),
            count = service.permissions.len(),
            "Loaded permissions"
        );
        Ok(service)
    }

    fn from_value(value: Value) -> PermissionResult<Self> {
        let permissions = match value {
            Value::Array(items) => items,
            Value::Object(object)
                if object.get("resourceType").and_then(Value::as_str) == Some("Bundle") =>
            {
                bundle_resources(object)
            }
            Value::Object(object) => vec![Value::Object(object)],
            other => {
                return Err(PermissionError::invalid_resource(format!(
                    "Expected a resource, an array or a Bundle, got {}",
                    json_kind(&other)
                )));
            }
        };
        Ok(Self::new(permissions))
    }

    pub fn permissions(&self) -> &[Value] {
        &self.permissions
    }
}

impl PermissionService for StaticPermissionService {
    fn get_permissions(&self, _context: &PermissionContext) -> PermissionResult<Vec<Value>> {
        Ok(self.permissions.clone())
    }
}

fn bundle_resources(mut bundle: serde_json::Map<String, Value>) -> Vec<Value> {
    match bundle.remove("entry") {
        Some(Value::Array(entries)) => entries
            .into_iter()
            .filter_map(|mut entry| entry.get_mut("resource").map(Value::take))
            .collect(),
        _ => Vec::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
