use anyhow::Result;
use colored::Colorize;
use octofhir_permission::PermissionRule;

use crate::cli::OutputFormat;
use crate::commands::Session;
use crate::output::{print_field, print_json};

pub fn compile(session: &Session, format: OutputFormat) -> Result<()> {
    let rules = session.evaluator.compile_rules(session.service.permissions());

    match format {
        OutputFormat::Json => print_json(&rules)?,
        OutputFormat::Text => {
            if rules.is_empty() {
                println!("No rules compiled; every request will be allowed.");
            }
            for rule in &rules {
                print_rule(rule);
            }
        }
    }
    Ok(())
}

fn print_rule(rule: &PermissionRule) {
    let effect = if rule.is_allow() {
        "permit".green()
    } else {
        "deny".red()
    };
    let operations: Vec<&str> = rule.operations().iter().map(|op| op.as_str()).collect();
    let operations = if operations.is_empty() {
        "(none)".to_string()
    } else {
        operations.join(", ")
    };

    println!("{} {}", effect, rule.resource_type().bold());
    print_field("  Operations", &operations);
    for expression in rule.search_expressions() {
        print_field("  Search", expression);
    }
    for expression in rule.blacklist_expressions() {
        print_field("  Redact", expression);
    }
}
