//! Rule compiler.
//!
//! Turns FHIR `Permission` resources into [`PermissionRule`]s. Compilation
//! never fails: anything the engine cannot interpret (inactive permissions,
//! non-instance data, expressions in other languages) is logged and dropped.
//!
//! Output order is permission order, then rule order, then the order in which
//! each rule first mentions a resource type.

use indexmap::IndexMap;
use serde_json::Value;

use crate::config::LanguageConfig;
use crate::model::{PermissionOperation, PermissionRule};
use crate::resources::permission::{
    DataMeaning, PERMISSION_RESOURCE_TYPE, Permission, RuleComponent,
};

/// Expressions collected for one resource type of a rule.
#[derive(Debug, Default)]
struct TypeExpressions {
    blacklist: Vec<String>,
    search: Vec<String>,
}

/// Compiles raw permission resources into rules.
#[must_use]
pub fn compile_rules(resources: &[Value], languages: &LanguageConfig) -> Vec<PermissionRule> {
    let mut rules = Vec::new();

    for resource in resources {
        let resource_type = resource.get("resourceType").and_then(Value::as_str);
        if resource_type != Some(PERMISSION_RESOURCE_TYPE) {
            tracing::debug!(
                resource_type = resource_type.unwrap_or("<none>"),
                "Ignoring resource that is not a Permission"
            );
            continue;
        }

        let permission = match Permission::from_json(resource) {
            Ok(permission) => permission,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed Permission");
                continue;
            }
        };

        rules.extend(compile_permission(&permission, languages));
    }

    tracing::debug!(rule_count = rules.len(), "Compiled permission rules");
    rules
}

/// Compiles a single permission. Inactive permissions yield no rules.
#[must_use]
pub fn compile_permission(
    permission: &Permission,
    languages: &LanguageConfig,
) -> Vec<PermissionRule> {
    if !permission.is_active() {
        tracing::warn!(
            permission_id = permission.id_part(),
            status = ?permission.status,
            "Ignoring inactive Permission"
        );
        return Vec::new();
    }

    permission
        .rule
        .iter()
        .flat_map(|rule| compile_rule(permission, rule, languages))
        .collect()
}

fn compile_rule(
    permission: &Permission,
    rule: &RuleComponent,
    languages: &LanguageConfig,
) -> Vec<PermissionRule> {
    let allow = rule.is_permit();
    let mut resource_types: IndexMap<String, TypeExpressions> = IndexMap::new();

    for data in &rule.data {
        for data_resource in &data.resource {
            if data_resource.meaning != DataMeaning::Instance {
                tracing::warn!(
                    permission_id = permission.id_part(),
                    meaning = ?data_resource.meaning,
                    "Ignoring Permission rule data that is not for a resource instance"
                );
                continue;
            }

            // The referenced resource type is carried in reference.display.
            let Some(resource_type) = data_resource
                .reference
                .display
                .as_deref()
                .map(str::trim)
                .filter(|display| !display.is_empty())
            else {
                continue;
            };

            let expressions = resource_types.entry(resource_type.to_string()).or_default();

            if allow {
                if let Some(search) = data.expression_in(&languages.query) {
                    expressions.search.push(search.to_string());
                }
            } else if let Some(path) = data.expression_in(&languages.path) {
                expressions.blacklist.push(path.to_string());
            }
        }
    }

    let operations: Vec<PermissionOperation> = rule
        .action_codes()
        .map(PermissionOperation::from_action_code)
        .collect();

    resource_types
        .into_iter()
        .map(|(resource_type, expressions)| {
            PermissionRule::new(
                resource_type,
                operations.iter().copied(),
                allow,
                expressions.blacklist,
                expressions.search,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(resources: &[Value]) -> Vec<PermissionRule> {
        compile_rules(resources, &LanguageConfig::default())
    }

    fn instance(resource_type: &str) -> Value {
        json!({ "meaning": "instance", "reference": { "display": resource_type } })
    }

    fn fhirpath(expression: &str) -> Value {
        json!({ "language": "text/fhirpath", "expression": expression })
    }

    fn query(expression: &str) -> Value {
        json!({ "language": "application/x-fhir-query", "expression": expression })
    }

    fn activity(codes: &[&str]) -> Value {
        let coding: Vec<Value> = codes.iter().map(|c| json!({ "code": c })).collect();
        json!([{ "action": [{ "coding": coding }] }])
    }

    #[test]
    fn test_inactive_permission_yields_no_rules() {
        let rules = compile(&[json!({
            "resourceType": "Permission",
            "id": "draft",
            "status": "draft",
            "rule": [{ "type": "permit", "data": [{ "resource": [instance("Patient")] }] }]
        })]);
        assert!(rules.is_empty());
    }

    #[test]
    fn test_non_permission_resources_are_ignored() {
        let rules = compile(&[
            json!({ "resourceType": "Patient", "id": "p1" }),
            json!({ "resourceType": "Permission", "rule": "not-a-list", "status": "active" }),
        ]);
        assert!(rules.is_empty());
    }

    #[test]
    fn test_deny_rule_with_fhirpath() {
        let rules = compile(&[json!({
            "resourceType": "Permission",
            "status": "active",
            "rule": [{
                "type": "deny",
                "data": [{ "resource": [instance("Patient")], "expression": fhirpath("name") }]
            }]
        })]);

        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.resource_type(), "Patient");
        assert!(!rule.is_allow());
        assert!(rule.operations().is_empty());
        assert_eq!(rule.blacklist_expressions(), ["name"]);
        assert!(rule.search_expressions().is_empty());
    }

    #[test]
    fn test_permit_rule_with_query() {
        let rules = compile(&[json!({
            "resourceType": "Permission",
            "status": "active",
            "rule": [{
                "type": "permit",
                "data": [{ "resource": [instance("Patient")], "expression": query("identifier=sys|1") }],
                "activity": activity(&["read", "SEARCH"])
            }]
        })]);

        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert!(rule.is_allow());
        assert_eq!(rule.search_expressions(), ["identifier=sys|1"]);
        assert!(rule.blacklist_expressions().is_empty());
        assert!(rule.operations().contains(&PermissionOperation::Read));
        assert!(rule.operations().contains(&PermissionOperation::Search));
        assert_eq!(rule.operations().len(), 2);
    }

    #[test]
    fn test_language_must_match_side() {
        // A permit carrying a FHIRPath expression and a deny carrying a query
        // both contribute nothing.
        let rules = compile(&[json!({
            "resourceType": "Permission",
            "status": "active",
            "rule": [
                { "type": "permit", "data": [{ "resource": [instance("Patient")], "expression": fhirpath("name") }] },
                { "type": "deny", "data": [{ "resource": [instance("Patient")], "expression": query("name=x") }] }
            ]
        })]);

        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|r| r.blacklist_expressions().is_empty()));
        assert!(rules.iter().all(|r| r.search_expressions().is_empty()));
    }

    #[test]
    fn test_non_instance_data_contributes_nothing() {
        let rules = compile(&[json!({
            "resourceType": "Permission",
            "status": "active",
            "rule": [{
                "type": "deny",
                "data": [
                    { "resource": [{ "meaning": "related", "reference": { "display": "Observation" } }], "expression": fhirpath("value") },
                    { "resource": [instance("Patient")], "expression": fhirpath("telecom") }
                ]
            }]
        })]);

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].resource_type(), "Patient");
        assert_eq!(rules[0].blacklist_expressions(), ["telecom"]);
    }

    #[test]
    fn test_one_rule_per_type_in_first_seen_order() {
        let rules = compile(&[json!({
            "resourceType": "Permission",
            "status": "active",
            "rule": [{
                "type": "deny",
                "data": [
                    { "resource": [instance("Observation")], "expression": fhirpath("value") },
                    { "resource": [instance("Patient")], "expression": fhirpath("telecom") },
                    { "resource": [instance("Observation")], "expression": fhirpath("note") }
                ],
                "activity": activity(&["read"])
            }]
        })]);

        let types: Vec<&str> = rules.iter().map(|r| r.resource_type()).collect();
        assert_eq!(types, vec!["Observation", "Patient"]);
        assert_eq!(rules[0].blacklist_expressions(), ["value", "note"]);
        assert!(rules.iter().all(|r| r.operations().contains(&PermissionOperation::Read)));
    }

    #[test]
    fn test_rule_order_follows_declarations() {
        let rules = compile(&[
            json!({
                "resourceType": "Permission",
                "status": "active",
                "rule": [
                    { "type": "permit", "data": [{ "resource": [instance("Patient")] }] },
                    { "type": "deny", "data": [{ "resource": [instance("Encounter")] }] }
                ]
            }),
            json!({
                "resourceType": "Permission",
                "status": "active",
                "rule": [{ "type": "permit", "data": [{ "resource": [instance("Observation")] }] }]
            }),
        ]);

        let types: Vec<&str> = rules.iter().map(|r| r.resource_type()).collect();
        assert_eq!(types, vec!["Patient", "Encounter", "Observation"]);
    }

    #[test]
    fn test_unknown_action_codes_map_to_custom() {
        let rules = compile(&[json!({
            "resourceType": "Permission",
            "status": "active",
            "rule": [{
                "type": "permit",
                "data": [{ "resource": [instance("Patient")] }],
                "activity": activity(&["$everything", "export"])
            }]
        })]);

        let ops: Vec<PermissionOperation> = rules[0].operations().iter().copied().collect();
        assert_eq!(ops, vec![PermissionOperation::Custom]);
    }

    #[test]
    fn test_data_without_display_registers_nothing() {
        let rules = compile(&[json!({
            "resourceType": "Permission",
            "status": "active",
            "rule": [{
                "type": "deny",
                "data": [{
                    "resource": [{ "meaning": "instance", "reference": { "reference": "Patient/1" } }],
                    "expression": fhirpath("name")
                }]
            }]
        })]);
        assert!(rules.is_empty());
    }

    #[test]
    fn test_entry_without_meaning_does_not_drop_permission() {
        let rules = compile(&[json!({
            "resourceType": "Permission",
            "id": "deny-read",
            "status": "active",
            "rule": [{
                "type": "deny",
                "data": [
                    { "resource": [{ "reference": { "display": "Observation" } }] },
                    { "resource": [instance("Patient")], "expression": fhirpath("telecom") }
                ],
                "activity": activity(&["read"])
            }]
        })]);

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].resource_type(), "Patient");
        assert!(rules[0].denies("Patient", PermissionOperation::Read));
        assert_eq!(rules[0].blacklist_expressions(), ["telecom"]);
    }

    #[test]
    fn test_unrecognised_rule_type_is_deny() {
        let rules = compile(&[json!({
            "resourceType": "Permission",
            "status": "active",
            "rule": [{
                "type": "forbid",
                "data": [{ "resource": [instance("Patient")] }],
                "activity": activity(&["read"])
            }]
        })]);

        assert_eq!(rules.len(), 1);
        assert!(!rules[0].is_allow());
        assert!(rules[0].denies("Patient", PermissionOperation::Read));
    }

    #[test]
    fn test_custom_languages() {
        let languages = LanguageConfig {
            path: "text/x-path".to_string(),
            query: "text/x-query".to_string(),
        };
        let rules = compile_rules(
            &[json!({
                "resourceType": "Permission",
                "status": "active",
                "rule": [{
                    "type": "deny",
                    "data": [{
                        "resource": [instance("Patient")],
                        "expression": { "language": "text/x-path", "expression": "photo" }
                    }]
                }]
            })],
            &languages,
        );
        assert_eq!(rules[0].blacklist_expressions(), ["photo"]);
    }
}
