//! FHIR resources consumed by the engine.

pub mod permission;

pub use permission::{
    CodeableConcept, Coding, DataMeaning, Expression, Permission, PermissionStatus,
    ProvisionType, Reference, RuleActivity, RuleComponent, RuleData, RuleDataResource,
};
