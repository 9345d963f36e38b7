//! String-level entry points.
//!
//! Hosts that cannot exchange Rust types with the engine (gateways, scripting
//! bridges, the CLI) pass requests as plain strings: an HTTP verb, a raw query
//! string, and JSON bodies. [`PermissionFacade`] converts them, delegates to
//! the [`FhirAuthorizationEngine`], and renders the results back to strings.

use serde_json::Value;

use crate::PermissionResult;
use crate::engine::FhirAuthorizationEngine;
use crate::error::PermissionError;
use crate::model::{
    FhirRequest, FhirResponse, HttpVerb, PermissionContext, SearchParameters,
};

/// String-in, string-out wrapper around the authorization engine.
#[derive(Debug, Clone)]
pub struct PermissionFacade {
    engine: FhirAuthorizationEngine,
}

impl PermissionFacade {
    #[must_use]
    pub fn new(engine: FhirAuthorizationEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &FhirAuthorizationEngine {
        &self.engine
    }

    /// Authorizes a request and returns its rewritten query string.
    ///
    /// # Errors
    ///
    /// - [`PermissionError::Configuration`] for an unknown HTTP verb
    /// - [`PermissionError::InvalidResource`] for a malformed query or body
    /// - [`PermissionError::NotAllowed`] if the request is refused
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate_request(
        &self,
        user_id: &str,
        token: &str,
        http_verb: &str,
        resource_type: &str,
        resource_id: Option<&str>,
        operation_name: Option<&str>,
        query: Option<&str>,
        body: Option<&str>,
    ) -> PermissionResult<String> {
        let context = PermissionContext::new(user_id, token);

        let mut request = FhirRequest::new(http_verb.parse::<HttpVerb>()?, resource_type)
            .with_search_parameters(parse_search_parameters(query.unwrap_or_default())?);
        if let Some(id) = non_empty(resource_id) {
            request = request.with_resource_id(id);
        }
        if let Some(name) = non_empty(operation_name) {
            request = request.with_operation_name(name);
        }
        if let Some(body) = parse_body(body)? {
            request = request.with_body(body);
        }

        let result = self.engine.authorize_request(&context, &request)?;
        Ok(to_query_string(&result.modified_search_parameters))
    }

    /// Redacts a response body and returns it as pretty-printed JSON.
    ///
    /// An absent body yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::InvalidResource`] for a malformed body, or
    /// any error raised while fetching permissions.
    pub fn filter_response(
        &self,
        user_id: &str,
        token: &str,
        status_code: u16,
        body: Option<&str>,
    ) -> PermissionResult<String> {
        let context = PermissionContext::new(user_id, token);
        let response = FhirResponse::new(status_code, parse_body(body)?);

        let filtered = self.engine.filter_response(&context, response)?;
        match filtered.resource {
            Some(resource) => serde_json::to_string_pretty(&resource)
                .map_err(|e| PermissionError::invalid_resource(e.to_string())),
            None => Ok(String::new()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_body(body: Option<&str>) -> PermissionResult<Option<Value>> {
    match non_empty(body) {
        Some(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| PermissionError::invalid_resource(format!("Invalid JSON body: {e}"))),
        None => Ok(None),
    }
}

/// Parses a raw query string (`a=1,2&b=x%20y`) into search parameters.
///
/// Keys and each comma-separated value are percent-decoded; `+` decodes to a
/// space. A repeated key accumulates values. A key without a value maps to an
/// empty list.
///
/// # Errors
///
/// Returns [`PermissionError::InvalidResource`] if a component does not decode
/// to UTF-8.
pub fn parse_search_parameters(query: &str) -> PermissionResult<SearchParameters> {
    let mut parameters = SearchParameters::new();

    for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let values = parameters.entry(decode(key)?).or_default();
        if value.is_empty() {
            continue;
        }
        for item in value.split(',') {
            values.push(decode(item)?);
        }
    }

    Ok(parameters)
}

/// Renders search parameters as `key=v1,v2&key2=v3`, percent-encoding values.
#[must_use]
pub fn to_query_string(parameters: &SearchParameters) -> String {
    parameters
        .iter()
        .map(|(key, values)| {
            let values: Vec<_> = values.iter().map(|v| urlencoding::encode(v)).collect();
            format!("{key}={}", values.join(","))
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn decode(component: &str) -> PermissionResult<String> {
    let component = component.replace('+', " ");
    urlencoding::decode(&component)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| PermissionError::invalid_resource(format!("Invalid query component: {e}")))
}
