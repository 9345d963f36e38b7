use anyhow::Result;
use octofhir_permission::FhirResponse;

use crate::cli::FilterArgs;
use crate::commands::{Session, read_document};
use crate::output::print_json;

pub fn filter(session: &Session, args: &FilterArgs) -> Result<()> {
    let document = read_document(args.input.as_deref())?;

    let filtered = session
        .engine()
        .filter_response(&session.context, FhirResponse::new(args.status, Some(document)))?;

    if let Some(resource) = &filtered.resource {
        print_json(resource)?;
    }
    Ok(())
}
