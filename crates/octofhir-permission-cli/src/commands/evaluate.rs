use anyhow::Result;
use octofhir_permission::{FhirRequest, HttpVerb, parse_search_parameters, to_query_string};
use serde_json::json;

use crate::cli::{EvaluateArgs, OutputFormat};
use crate::commands::Session;
use crate::output::{print_field, print_json, print_refusal, print_success};

pub fn evaluate(session: &Session, args: &EvaluateArgs, format: OutputFormat) -> Result<()> {
    let method: HttpVerb = args.method.parse()?;
    let parameters = parse_search_parameters(args.query.as_deref().unwrap_or_default())?;

    let mut request =
        FhirRequest::new(method, &args.resource_type).with_search_parameters(parameters);
    if let Some(id) = &args.id {
        request = request.with_resource_id(id);
    }
    if let Some(operation) = &args.operation {
        request = request.with_operation_name(operation);
    }

    let operation = request.operation();
    let result = session.engine().evaluate_request(&session.context, &request)?;
    let allowed = result.allowed;
    let query = to_query_string(&result.modified_search_parameters);

    match format {
        OutputFormat::Json => print_json(&json!({
            "operation": operation,
            "allowed": allowed,
            "query": query,
            "result": result,
        }))?,
        OutputFormat::Text => {
            let summary = format!("{operation} on {}", args.resource_type);
            if allowed {
                print_success(&format!("Allowed: {summary}"));
            } else {
                print_refusal(&format!("Refused: {summary}"));
            }
            print_field("Rules", &result.rules_applied.len().to_string());
            if allowed && !query.is_empty() {
                print_field("Query", &query);
            }
        }
    }

    if !allowed {
        anyhow::bail!("Request refused by permissions");
    }
    Ok(())
}
