//! Search parameter catalogue.
//!
//! The criteria matcher reuses allow-rule search fragments (`identifier=sys|val`)
//! as match conditions. To evaluate one against a resource, the parameter name
//! is resolved to the path expression that defines it.

use dashmap::DashMap;

use crate::config::SearchConfig;

/// Resolves search parameter codes to their path expressions.
pub trait SearchParameterCatalog: Send + Sync {
    /// Returns the expression of `code` for `resource_type`, or `None` if the
    /// parameter is unknown.
    fn resolve(&self, resource_type: &str, code: &str) -> Option<String>;
}

/// Token search parameters registered by [`StaticSearchParameterCatalog::with_common_parameters`].
///
/// `(resource types, code, expression)`; `{type}` is replaced by each resource
/// type in turn.
const TOKEN_PARAMETERS: &[(&[&str], &str, &str)] = &[
    (
        &[
            "Patient",
            "Practitioner",
            "PractitionerRole",
            "Organization",
            "Encounter",
            "Observation",
            "Condition",
            "Procedure",
            "MedicationRequest",
            "DiagnosticReport",
            "Immunization",
            "AllergyIntolerance",
            "CarePlan",
            "Location",
            "Device",
            "DocumentReference",
            "ServiceRequest",
            "Appointment",
        ],
        "identifier",
        "{type}.identifier",
    ),
    (
        &[
            "Observation",
            "Condition",
            "Procedure",
            "DiagnosticReport",
            "AllergyIntolerance",
            "ServiceRequest",
        ],
        "code",
        "{type}.code",
    ),
    (
        &["Observation", "Condition", "DiagnosticReport", "CarePlan", "DocumentReference"],
        "category",
        "{type}.category",
    ),
    (
        &[
            "Observation",
            "Encounter",
            "Procedure",
            "MedicationRequest",
            "DiagnosticReport",
            "Immunization",
            "CarePlan",
            "ServiceRequest",
            "Appointment",
        ],
        "status",
        "{type}.status",
    ),
    (
        &["Patient", "Practitioner", "RelatedPerson"],
        "gender",
        "{type}.gender",
    ),
    (&["Encounter"], "class", "Encounter.class"),
    (&["Organization", "Location"], "type", "{type}.type"),
];

/// Parameters shared by every resource type.
const COMMON_PARAMETERS: &[(&str, &str)] = &[
    ("_id", "Resource.id"),
    ("_tag", "Resource.meta.tag"),
    ("_security", "Resource.meta.security"),
    ("_source", "Resource.meta.source"),
];

/// In-memory catalogue of search parameter expressions.
///
/// Lookups check resource-specific parameters first, then parameters common
/// to all resources. Registration is thread-safe and can happen while the
/// catalogue is in use.
#[derive(Debug, Default)]
pub struct StaticSearchParameterCatalog {
    by_resource: DashMap<(String, String), String>,
    common: DashMap<String, String>,
}

impl StaticSearchParameterCatalog {
    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalogue pre-populated with the common token parameters.
    #[must_use]
    pub fn with_common_parameters() -> Self {
        let catalog = Self::new();
        for (code, expression) in COMMON_PARAMETERS {
            catalog.register_common(*code, *expression);
        }
        for (resource_types, code, expression) in TOKEN_PARAMETERS {
            for resource_type in *resource_types {
                catalog.register(
                    *resource_type,
                    *code,
                    expression.replace("{type}", resource_type),
                );
            }
        }
        catalog
    }

    /// Builds the catalogue described by `config`.
    #[must_use]
    pub fn from_config(config: &SearchConfig) -> Self {
        if config.common_parameters {
            Self::with_common_parameters()
        } else {
            Self::new()
        }
    }

    /// Registers (or replaces) a parameter for one resource type.
    pub fn register(
        &self,
        resource_type: impl Into<String>,
        code: impl Into<String>,
        expression: impl Into<String>,
    ) {
        self.by_resource
            .insert((resource_type.into(), code.into()), expression.into());
    }

    /// Registers (or replaces) a parameter applicable to every resource type.
    pub fn register_common(&self, code: impl Into<String>, expression: impl Into<String>) {
        self.common.insert(code.into(), expression.into());
    }

    /// Total number of registered parameters.
    pub fn len(&self) -> usize {
        self.by_resource.len() + self.common.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SearchParameterCatalog for StaticSearchParameterCatalog {
    fn resolve(&self, resource_type: &str, code: &str) -> Option<String> {
        let key = (resource_type.to_string(), code.to_string());
        if let Some(expression) = self.by_resource.get(&key) {
            return Some(expression.clone());
        }
        self.common.get(code).map(|expression| expression.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_specific_lookup() {
        let catalog = StaticSearchParameterCatalog::with_common_parameters();
        assert_eq!(
            catalog.resolve("Patient", "identifier").as_deref(),
            Some("Patient.identifier")
        );
        assert_eq!(
            catalog.resolve("Observation", "code").as_deref(),
            Some("Observation.code")
        );
        assert_eq!(catalog.resolve("Patient", "code"), None);
    }

    #[test]
    fn test_common_fallback() {
        let catalog = StaticSearchParameterCatalog::with_common_parameters();
        assert_eq!(
            catalog.resolve("Anything", "_tag").as_deref(),
            Some("Resource.meta.tag")
        );
    }

    #[test]
    fn test_specific_overrides_common() {
        let catalog = StaticSearchParameterCatalog::new();
        catalog.register_common("_id", "Resource.id");
        catalog.register("Patient", "_id", "Patient.id");

        assert_eq!(catalog.resolve("Patient", "_id").as_deref(), Some("Patient.id"));
        assert_eq!(
            catalog.resolve("Observation", "_id").as_deref(),
            Some("Resource.id")
        );
    }

    #[test]
    fn test_from_config() {
        let empty = StaticSearchParameterCatalog::from_config(&SearchConfig {
            common_parameters: false,
        });
        assert!(empty.is_empty());
        assert_eq!(empty.resolve("Patient", "identifier"), None);

        let full = StaticSearchParameterCatalog::from_config(&SearchConfig::default());
        assert!(!full.is_empty());
    }
}
