//! FHIR R5 `Permission` resource.
//!
//! Only the elements the rule compiler reads are modelled; everything else in
//! the JSON is ignored on deserialization.
//!
//! ```json
//! {
//!   "resourceType": "Permission",
//!   "id": "restrict-telecom",
//!   "status": "active",
//!   "combining": "deny-overrides",
//!   "rule": [{
//!     "type": "deny",
//!     "data": [{
//!       "resource": [{ "meaning": "instance", "reference": { "display": "Patient" } }],
//!       "expression": { "language": "text/fhirpath", "expression": "Patient.telecom" }
//!     }],
//!     "activity": [{ "action": [{ "coding": [{ "code": "read" }] }] }]
//!   }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The FHIR `Permission` resource type name.
pub const PERMISSION_RESOURCE_TYPE: &str = "Permission";

// =============================================================================
// Permission Resource
// =============================================================================

/// A lifecycle-gated container of declared rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Resource type - always "Permission".
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub status: PermissionStatus,

    /// Declared combining algorithm. Informational only: evaluation is
    /// always deny-overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combining: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule: Vec<RuleComponent>,
}

fn default_resource_type() -> String {
    PERMISSION_RESOURCE_TYPE.to_string()
}

impl Permission {
    /// Deserializes a `Permission` from FHIR JSON.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the JSON does not describe a `Permission`.
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Returns `true` if the permission is in force.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PermissionStatus::Active
    }

    /// Identifier used in log messages.
    pub fn id_part(&self) -> &str {
        self.id.as_deref().unwrap_or("<no id>")
    }
}

/// `Permission.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionStatus {
    Active,
    EnteredInError,
    Draft,
    Rejected,
    #[serde(other)]
    Unknown,
}

// =============================================================================
// Rule
// =============================================================================

/// `Permission.rule` - a PERMIT/DENY statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleComponent {
    /// Missing type is treated as deny.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub provision_type: Option<ProvisionType>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<RuleData>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activity: Vec<RuleActivity>,
}

impl RuleComponent {
    /// Returns `true` for PERMIT rules.
    #[must_use]
    pub fn is_permit(&self) -> bool {
        self.provision_type == Some(ProvisionType::Permit)
    }

    /// All `activity.action.coding.code` values in document order.
    pub fn action_codes(&self) -> impl Iterator<Item = &str> {
        self.activity
            .iter()
            .flat_map(|activity| activity.action.iter())
            .flat_map(|action| action.coding.iter())
            .filter_map(|coding| coding.code.as_deref())
    }
}

/// `Permission.rule.type`. Unrecognised codes are treated as deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionType {
    Permit,
    Deny,
    #[serde(other)]
    Unknown,
}

/// `Permission.rule.data` - which resources a rule is about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<RuleDataResource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<Expression>,
}

impl RuleData {
    /// Returns the expression text when it is written in `language` and
    /// non-empty.
    pub fn expression_in(&self, language: &str) -> Option<&str> {
        let expression = self.expression.as_ref()?;
        if expression.language.as_deref() != Some(language) {
            return None;
        }
        expression
            .expression
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// `Permission.rule.data.resource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDataResource {
    /// A missing meaning reads as `Unknown`, so only this entry is skipped.
    #[serde(default)]
    pub meaning: DataMeaning,

    #[serde(default)]
    pub reference: Reference,
}

/// `ConsentDataMeaning`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMeaning {
    Instance,
    Related,
    Dependents,
    Authoredby,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Minimal FHIR `Reference`. The compiler reads the resource type from
/// `display`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// FHIR `Expression`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

/// `Permission.rule.activity`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleActivity {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action: Vec<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub purpose: Vec<CodeableConcept>,
}

/// FHIR `CodeableConcept`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// FHIR `Coding`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
