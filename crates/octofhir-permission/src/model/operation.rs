//! Operations and HTTP verbs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PermissionError;

/// The abstract action being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionOperation {
    /// Read a resource by ID (GET /[type]/[id])
    Read,
    /// Search a resource type (GET /[type]?params)
    Search,
    /// Create a resource (POST /[type])
    Create,
    /// Update a resource (PUT /[type]/[id])
    Update,
    /// Delete a resource (DELETE /[type]/[id])
    Delete,
    /// Patch a resource (PATCH /[type]/[id])
    Patch,
    /// Named operation (POST /[type]/$operation), and any unrecognized action code
    Custom,
}

impl PermissionOperation {
    /// All operations, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Read,
        Self::Search,
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::Patch,
        Self::Custom,
    ];

    /// Maps a `Permission.rule.activity.action` code to an operation.
    ///
    /// Matching is case-insensitive. Codes outside the CRUD vocabulary map to
    /// [`PermissionOperation::Custom`], so this never fails.
    #[must_use]
    pub fn from_action_code(code: &str) -> Self {
        match code.to_ascii_lowercase().as_str() {
            "read" => Self::Read,
            "search" => Self::Search,
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "patch" => Self::Patch,
            _ => Self::Custom,
        }
    }

    /// Returns the lowercase action code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Search => "search",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Patch => "patch",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for PermissionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP verbs understood by the engine.
///
/// The set is closed: anything else is rejected when parsing instead of
/// silently mapping to a default operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpVerb {
    /// Returns the canonical uppercase verb.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl FromStr for HttpVerb {
    type Err = PermissionError;

    /// Parses a verb case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `PermissionError::Configuration` for unknown verbs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            other => Err(PermissionError::configuration(format!(
                "Unknown method: {other}"
            ))),
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
