use std::sync::Arc;

use anyhow::Result;
use octofhir_permission::{
    CriteriaMatcher, FhirJsonModel, PermissionError, StaticSearchParameterCatalog,
};

use crate::cli::MatchArgs;
use crate::commands::{Session, read_document};
use crate::output::{print_refusal, print_success};

pub fn check(session: &Session, args: &MatchArgs) -> Result<()> {
    let document = read_document(args.input.as_deref())?;
    let rules = session.engine().rules_for(&session.context)?;

    let matcher = CriteriaMatcher::new(
        session.path_evaluator.clone(),
        Arc::new(StaticSearchParameterCatalog::from_config(&session.config.search)),
        Arc::new(FhirJsonModel::from_config(&session.config.document)),
    );

    match matcher.match_or_reject(&document, &rules) {
        Ok(()) => {
            print_success("Resource matches the permission criteria");
            Ok(())
        }
        Err(PermissionError::NotFound) => {
            print_refusal("Resource is hidden by the permission criteria");
            anyhow::bail!("Resource does not match")
        }
        Err(e) => Err(e.into()),
    }
}
