//! Value types shared by the compiler, evaluator and engine.

pub mod context;
pub mod operation;
pub mod request;
pub mod result;
pub mod rule;

pub use context::PermissionContext;
pub use operation::{HttpVerb, PermissionOperation};
pub use request::{FhirRequest, FhirResponse, SearchParameters};
pub use result::RequestEvaluationResult;
pub use rule::{PermissionRule, WILDCARD_RESOURCE_TYPE};
