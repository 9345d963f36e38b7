use std::sync::{Arc, OnceLock};

use assert_json_diff::assert_json_eq;
use octofhir_permission::prelude::*;
use serde_json::{Value, json};

fn deny_patient_name() -> Value {
    json!({
        "resourceType": "Permission",
        "id": "deny-name",
        "status": "active",
        "combining": "deny-overrides",
        "rule": [{
            "type": "deny",
            "data": [{
                "resource": [{ "meaning": "instance", "reference": { "display": "Patient" } }],
                "expression": { "language": "text/fhirpath", "expression": "name" }
            }]
        }]
    })
}

fn permit_patient_search() -> Value {
    json!({
        "resourceType": "Permission",
        "id": "permit-search",
        "status": "active",
        "combining": "deny-overrides",
        "rule": [{
            "type": "permit",
            "data": [{
                "resource": [{ "meaning": "instance", "reference": { "display": "Patient" } }],
                "expression": { "language": "application/x-fhir-query", "expression": "identifier=system|code" }
            }],
            "activity": [{ "action": [{ "coding": [{ "code": "search" }] }] }]
        }]
    })
}

fn evaluator() -> Arc<PermissionEvaluator> {
    static EVALUATOR: OnceLock<Arc<PermissionEvaluator>> = OnceLock::new();
    EVALUATOR
        .get_or_init(|| {
            Arc::new(
                PermissionEvaluator::with_defaults(PermissionConfig::default())
                    .expect("build FHIRPath engine"),
            )
        })
        .clone()
}

fn engine(permissions: Vec<Value>) -> FhirAuthorizationEngine {
    FhirAuthorizationEngine::new(Arc::new(StaticPermissionService::new(permissions)), evaluator())
}

fn context() -> PermissionContext {
    PermissionContext::new("practitioner-1", "opaque-token").with_roles(["doctor"])
}

#[test]
fn deny_only_declaration_compiles_and_refuses() {
    let evaluator = evaluator();
    let rules = evaluator.compile_rules(&[deny_patient_name()]);

    assert_eq!(rules.len(), 1);
    assert_json_eq!(
        serde_json::to_value(&rules[0]).expect("serialize rule"),
        json!({
            "resourceType": "Patient",
            "operations": [],
            "allow": false,
            "blacklistExpressions": ["name"],
            "searchExpressions": []
        })
    );

    assert!(!evaluator.can_perform("Patient", PermissionOperation::Read, &rules));
}

#[test]
fn permit_and_deny_declarations_combine() {
    let evaluator = evaluator();
    let rules = evaluator.compile_rules(&[deny_patient_name(), permit_patient_search()]);

    assert!(evaluator.can_perform("Patient", PermissionOperation::Search, &rules));
    assert!(!evaluator.can_perform("Patient", PermissionOperation::Read, &rules));
}

#[test]
fn search_is_scoped_and_response_redacted() {
    let engine = engine(vec![deny_patient_name(), permit_patient_search()]);

    let request = FhirRequest::new(HttpVerb::Get, "Patient");
    let result = engine
        .evaluate_request(&context(), &request)
        .expect("evaluate request");

    assert!(result.allowed);
    assert_eq!(result.rules_applied.len(), 2);
    assert_json_eq!(
        serde_json::to_value(&result.modified_search_parameters).expect("serialize params"),
        json!({ "identifier": ["system|code"] })
    );

    let bundle = json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "entry": [
            { "resource": { "resourceType": "Patient", "id": "a", "name": [{ "family": "A" }], "gender": "male" } },
            { "resource": { "resourceType": "Patient", "id": "b", "gender": "female" } }
        ]
    });

    let filtered = engine
        .filter_response(&context(), FhirResponse::new(200, Some(bundle)))
        .expect("filter response");

    assert_json_eq!(
        filtered.resource.expect("body"),
        json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "entry": [
                { "resource": { "resourceType": "Patient", "id": "a", "gender": "male" } },
                { "resource": { "resourceType": "Patient", "id": "b", "gender": "female" } }
            ]
        })
    );
}

#[test]
fn search_parameters_merge_across_rules() {
    let evaluator = evaluator();
    let rules = vec![
        PermissionRule::new("Patient", [PermissionOperation::Search], true, vec![], vec![
            "identifier=system|code".to_string(),
        ]),
        PermissionRule::new("Patient", [PermissionOperation::Search], true, vec![], vec![
            "name=Toto,Tata,Tutu".to_string(),
            "identifier=other|value".to_string(),
        ]),
    ];

    let updated = evaluator.update_search_parameters("Patient", None, &rules);

    assert_json_eq!(
        serde_json::to_value(&updated).expect("serialize params"),
        json!({
            "identifier": ["system|code", "other|value"],
            "name": ["Toto", "Tata", "Tutu"]
        })
    );
}

#[test]
fn read_result_is_checked_against_criteria() {
    let rules = evaluator().compile_rules(&[permit_patient_search()]);
    let path_evaluator = FhirPathEngineEvaluator::from_config(&FhirConfig::default())
        .expect("build FHIRPath engine");
    let matcher = CriteriaMatcher::new(
        Arc::new(path_evaluator),
        Arc::new(StaticSearchParameterCatalog::with_common_parameters()),
        Arc::new(FhirJsonModel::default()),
    );

    let visible = json!({
        "resourceType": "Patient",
        "identifier": [{ "system": "system", "value": "code" }]
    });
    let hidden = json!({
        "resourceType": "Patient",
        "identifier": [{ "system": "system", "value": "other" }]
    });

    assert!(matcher.match_or_reject(&visible, &rules).is_ok());
    let err = matcher
        .match_or_reject(&hidden, &rules)
        .expect_err("criteria mismatch");
    assert!(matches!(err, PermissionError::NotFound));
    assert_eq!(err.http_status(), 404);
}

#[test]
fn facade_round_trip() {
    let facade = PermissionFacade::new(engine(vec![permit_patient_search()]));

    let query = facade
        .evaluate_request(
            "practitioner-1",
            "opaque-token",
            "get",
            "Patient",
            None,
            None,
            Some("name=Doe"),
            None,
        )
        .expect("allowed search");
    assert_eq!(query, "name=Doe&identifier=system%7Ccode");

    let parsed = octofhir_permission::parse_search_parameters(&query).expect("parse query");
    assert_eq!(parsed["identifier"], vec!["system|code"]);

    let err = facade
        .evaluate_request("practitioner-1", "opaque-token", "DELETE", "Patient", Some("1"), None, None, None)
        .expect_err("delete refused");
    assert_eq!(err.category(), ErrorCategory::Authorization);
}

#[test]
fn redaction_removes_the_matched_node_not_an_earlier_copy() {
    let email = json!({ "system": "email", "value": "a@b.c" });
    let deny_email = json!({
        "resourceType": "Permission",
        "status": "active",
        "rule": [{
            "type": "deny",
            "data": [
                {
                    "resource": [{ "meaning": "instance", "reference": { "display": "Patient" } }],
                    "expression": { "language": "text/fhirpath", "expression": "Patient.telecom.where(system='email')" }
                },
                {
                    "resource": [{ "meaning": "instance", "reference": { "display": "Patient" } }],
                    "expression": { "language": "text/fhirpath", "expression": "Patient.birthDate" }
                }
            ]
        }]
    });
    let patient = json!({
        "resourceType": "Patient",
        "id": "p1",
        "telecom": [email.clone()],
        "birthDate": "1970-01-01",
        "address": [{ "city": "Springfield", "period": { "start": "1970-01-01" } }],
        "contact": [{ "telecom": [email.clone()] }]
    });

    let filtered = engine(vec![deny_email])
        .filter_response(&context(), FhirResponse::new(200, Some(patient)))
        .expect("filter response");

    assert_json_eq!(
        filtered.resource.expect("body"),
        json!({
            "resourceType": "Patient",
            "id": "p1",
            "address": [{ "city": "Springfield", "period": { "start": "1970-01-01" } }],
            "contact": [{ "telecom": [email] }]
        })
    );
}

#[test]
fn deny_with_malformed_sibling_entry_still_refuses() {
    let permission = json!({
        "resourceType": "Permission",
        "status": "active",
        "rule": [{
            "type": "deny",
            "data": [
                { "resource": [{ "reference": { "display": "Patient" } }] },
                { "resource": [{ "meaning": "instance", "reference": { "display": "Patient" } }] }
            ],
            "activity": [{ "action": [{ "coding": [{ "code": "read" }] }] }]
        }]
    });

    let request = FhirRequest::new(HttpVerb::Get, "Patient").with_resource_id("1");
    let result = engine(vec![permission])
        .evaluate_request(&context(), &request)
        .expect("evaluate request");

    assert!(!result.allowed);
    assert_eq!(result.rules_applied.len(), 1);
}

#[test]
fn inactive_permissions_fail_open() {
    let mut draft = permit_patient_search();
    draft["status"] = json!("draft");
    let engine = engine(vec![draft]);

    let request = FhirRequest::new(HttpVerb::Delete, "Observation").with_resource_id("1");
    let result = engine
        .evaluate_request(&context(), &request)
        .expect("evaluate request");

    assert!(result.allowed);
    assert!(result.rules_applied.is_empty());
}
