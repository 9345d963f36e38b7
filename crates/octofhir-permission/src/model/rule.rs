//! Compiled permission rules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::operation::PermissionOperation;
use crate::PermissionResult;
use crate::error::PermissionError;

/// Resource type that matches every resource type.
pub const WILDCARD_RESOURCE_TYPE: &str = "*";

/// A normalized, evaluation-ready permission rule.
///
/// One rule is produced per resource type referenced by a `Permission.rule`.
/// Deny-side rules carry path expressions naming fields to redact; allow-side
/// rules carry search fragments that scope outgoing searches.
///
/// The resource type is never blank; deserialization rejects a blank one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RuleFields")]
pub struct PermissionRule {
    resource_type: String,
    operations: BTreeSet<PermissionOperation>,
    allow: bool,
    blacklist_expressions: Vec<String>,
    search_expressions: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleFields {
    resource_type: String,
    #[serde(default)]
    operations: BTreeSet<PermissionOperation>,
    allow: bool,
    #[serde(default)]
    blacklist_expressions: Vec<String>,
    #[serde(default)]
    search_expressions: Vec<String>,
}

impl TryFrom<RuleFields> for PermissionRule {
    type Error = PermissionError;

    fn try_from(fields: RuleFields) -> Result<Self, Self::Error> {
        Self::try_new(
            fields.resource_type,
            fields.operations,
            fields.allow,
            fields.blacklist_expressions,
            fields.search_expressions,
        )
    }
}

impl PermissionRule {
    /// Creates a rule, rejecting a blank resource type.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when `resource_type` is blank.
    pub fn try_new(
        resource_type: impl Into<String>,
        operations: impl IntoIterator<Item = PermissionOperation>,
        allow: bool,
        blacklist_expressions: Vec<String>,
        search_expressions: Vec<String>,
    ) -> PermissionResult<Self> {
        let resource_type = resource_type.into();
        if resource_type.trim().is_empty() {
            return Err(PermissionError::configuration(
                "Permission rule resource type cannot be blank",
            ));
        }
        Ok(Self::new(
            resource_type,
            operations,
            allow,
            blacklist_expressions,
            search_expressions,
        ))
    }

    /// Creates a rule. `resource_type` must not be blank: the rule compiler
    /// only emits types it read from a non-empty `reference.display`. Use
    /// [`PermissionRule::try_new`] for unchecked input.
    #[must_use]
    pub fn new(
        resource_type: impl Into<String>,
        operations: impl IntoIterator<Item = PermissionOperation>,
        allow: bool,
        blacklist_expressions: Vec<String>,
        search_expressions: Vec<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        debug_assert!(!resource_type.trim().is_empty(), "blank rule resource type");
        Self {
            resource_type,
            operations: operations.into_iter().collect(),
            allow,
            blacklist_expressions,
            search_expressions,
        }
    }

    /// Returns `true` if this rule targets `resource_type`, directly or via
    /// the wildcard.
    #[must_use]
    pub fn applies_to(&self, resource_type: &str) -> bool {
        self.resource_type == WILDCARD_RESOURCE_TYPE || self.resource_type == resource_type
    }

    /// Returns `true` if this is an allow rule covering the pair.
    #[must_use]
    pub fn allows(&self, resource_type: &str, operation: PermissionOperation) -> bool {
        self.allow && self.applies_to(resource_type) && self.operations.contains(&operation)
    }

    /// Returns `true` if this is a deny rule covering the pair.
    #[must_use]
    pub fn denies(&self, resource_type: &str, operation: PermissionOperation) -> bool {
        !self.allow && self.applies_to(resource_type) && self.operations.contains(&operation)
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn operations(&self) -> &BTreeSet<PermissionOperation> {
        &self.operations
    }

    pub fn is_allow(&self) -> bool {
        self.allow
    }

    /// Path expressions of fields to remove from responses.
    pub fn blacklist_expressions(&self) -> &[String] {
        &self.blacklist_expressions
    }

    /// Query fragments (`key=v1,v2&key2=v3`) injected into searches.
    pub fn search_expressions(&self) -> &[String] {
        &self.search_expressions
    }
}
