//! Document model capability.
//!
//! The redaction engine and the criteria matcher never inspect documents
//! directly. They go through a [`DocumentModel`], which exposes each
//! composite node's *field catalogue*: the named fields it holds, whether each
//! is a singleton or repeated, and how to remove one of their values.
//!
//! [`FhirJsonModel`] implements the catalogue for FHIR JSON, where composite
//! nodes are JSON objects and repeated fields are JSON arrays.

use serde_json::Value;

use crate::config::DocumentConfig;

/// Cardinality of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one value.
    Singleton,
    /// An ordered list of values.
    Repeated,
}

/// A named field exposed by a composite node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub cardinality: Cardinality,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            cardinality,
        }
    }

    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }
}

/// Structural view of documents used by matching and redaction.
///
/// Implementations must describe a rooted tree: no node may be reachable from
/// one of its own descendants.
pub trait DocumentModel: Send + Sync {
    /// The declared type of a document (e.g. `Patient`).
    fn resource_type<'a>(&self, document: &'a Value) -> Option<&'a str>;

    /// Returns `true` for collection documents (Bundles).
    fn is_collection(&self, document: &Value) -> bool;

    /// The entry sub-documents of a collection, in order.
    fn collection_entries_mut<'a>(&self, document: &'a mut Value) -> Vec<&'a mut Value>;

    /// Returns `true` if the node has a field catalogue.
    fn is_composite(&self, node: &Value) -> bool;

    /// Returns `true` for a composite node that holds no fields. Such nodes
    /// are pruned once redaction has emptied them.
    fn is_empty(&self, node: &Value) -> bool;

    /// The fields a composite node currently holds, or `None` if the node's
    /// schema cannot be resolved.
    fn field_catalog(&self, node: &Value) -> Option<Vec<FieldDescriptor>>;

    /// The values of a field, in order.
    fn field_values<'a>(&self, node: &'a Value, field: &FieldDescriptor) -> Vec<&'a Value>;

    /// Mutable access to the values of a field, in order.
    fn field_values_mut<'a>(
        &self,
        node: &'a mut Value,
        field: &FieldDescriptor,
    ) -> Vec<&'a mut Value>;

    /// Removes the value at `index` of a field. Repeated fields keep the order
    /// of their remaining values; singletons are cleared.
    ///
    /// Returns `false` if there was no such value.
    fn remove_value(&self, node: &mut Value, field: &FieldDescriptor, index: usize) -> bool;
}

/// Field catalogue for FHIR JSON resources.
#[derive(Debug, Clone)]
pub struct FhirJsonModel {
    collection_type: String,
}

impl Default for FhirJsonModel {
    fn default() -> Self {
        Self::new(DocumentConfig::default().collection_type)
    }
}

impl FhirJsonModel {
    /// Creates a model treating `collection_type` documents as collections.
    #[must_use]
    pub fn new(collection_type: impl Into<String>) -> Self {
        Self {
            collection_type: collection_type.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &DocumentConfig) -> Self {
        Self::new(config.collection_type.clone())
    }
}

/// Name of the primitive extension sibling of a FHIR JSON field.
fn extension_sibling(name: &str) -> String {
    format!("_{name}")
}

impl DocumentModel for FhirJsonModel {
    fn resource_type<'a>(&self, document: &'a Value) -> Option<&'a str> {
        document.get("resourceType").and_then(Value::as_str)
    }

    fn is_collection(&self, document: &Value) -> bool {
        self.resource_type(document) == Some(self.collection_type.as_str())
    }

    fn collection_entries_mut<'a>(&self, document: &'a mut Value) -> Vec<&'a mut Value> {
        match document.get_mut("entry") {
            Some(Value::Array(entries)) => entries
                .iter_mut()
                .filter_map(|entry| entry.get_mut("resource"))
                .filter(|resource| resource.is_object())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn is_composite(&self, node: &Value) -> bool {
        node.is_object()
    }

    fn is_empty(&self, node: &Value) -> bool {
        node.as_object().is_some_and(|object| object.is_empty())
    }

    fn field_catalog(&self, node: &Value) -> Option<Vec<FieldDescriptor>> {
        let object = node.as_object()?;
        Some(
            object
                .iter()
                // The type tag is not a field.
                .filter(|(name, _)| name.as_str() != "resourceType")
                .map(|(name, value)| {
                    let cardinality = if value.is_array() {
                        Cardinality::Repeated
                    } else {
                        Cardinality::Singleton
                    };
                    FieldDescriptor::new(name.clone(), cardinality)
                })
                .collect(),
        )
    }

    fn field_values<'a>(&self, node: &'a Value, field: &FieldDescriptor) -> Vec<&'a Value> {
        match node.get(&field.name) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(value) => vec![value],
        }
    }

    fn field_values_mut<'a>(
        &self,
        node: &'a mut Value,
        field: &FieldDescriptor,
    ) -> Vec<&'a mut Value> {
        match node.get_mut(&field.name) {
            Some(Value::Array(items)) => items.iter_mut().collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(value) => vec![value],
        }
    }

    fn remove_value(&self, node: &mut Value, field: &FieldDescriptor, index: usize) -> bool {
        let Some(object) = node.as_object_mut() else {
            return false;
        };
        let sibling = extension_sibling(&field.name);

        let emptied = match object.get_mut(&field.name) {
            Some(Value::Array(items)) => {
                if index >= items.len() {
                    return false;
                }
                items.remove(index);
                items.is_empty()
            }
            Some(Value::Null) | None => return false,
            Some(_) if index == 0 => true,
            Some(_) => return false,
        };

        // Keep the primitive extension array aligned with its values.
        if let Some(Value::Array(extensions)) = object.get_mut(&sibling)
            && index < extensions.len()
        {
            extensions.remove(index);
        }

        // FHIR JSON does not allow empty arrays; singletons are cleared outright.
        if emptied {
            object.shift_remove(&field.name);
            object.shift_remove(&sibling);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_type_and_collection() {
        let model = FhirJsonModel::default();
        let patient = json!({ "resourceType": "Patient" });
        let bundle = json!({ "resourceType": "Bundle", "type": "searchset" });

        assert_eq!(model.resource_type(&patient), Some("Patient"));
        assert!(!model.is_collection(&patient));
        assert!(model.is_collection(&bundle));
        assert_eq!(model.resource_type(&json!("x")), None);
    }

    #[test]
    fn test_custom_collection_type() {
        let model = FhirJsonModel::new("List");
        assert!(model.is_collection(&json!({ "resourceType": "List" })));
        assert!(!model.is_collection(&json!({ "resourceType": "Bundle" })));
    }

    #[test]
    fn test_collection_entries_skip_entries_without_resource() {
        let model = FhirJsonModel::default();
        let mut bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                { "resource": { "resourceType": "Patient", "id": "1" } },
                { "fullUrl": "urn:uuid:no-resource" },
                { "resource": { "resourceType": "Patient", "id": "2" } }
            ]
        });

        let entries = model.collection_entries_mut(&mut bundle);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["id"], "2");
    }

    #[test]
    fn test_field_catalog() {
        let model = FhirJsonModel::default();
        let patient = json!({
            "resourceType": "Patient",
            "gender": "female",
            "name": [{ "family": "Doe" }]
        });

        let catalog = model.field_catalog(&patient).unwrap();
        assert_eq!(
            catalog,
            vec![
                FieldDescriptor::new("gender", Cardinality::Singleton),
                FieldDescriptor::new("name", Cardinality::Repeated),
            ]
        );

        assert!(model.field_catalog(&json!("Doe")).is_none());
    }

    #[test]
    fn test_field_catalog_follows_document_order() {
        let model = FhirJsonModel::default();
        let patient = json!({
            "resourceType": "Patient",
            "telecom": [{ "value": "1" }],
            "birthDate": "1970-01-01",
            "address": [{ "city": "X" }],
            "contact": [{ "name": { "family": "Doe" } }]
        });

        let names: Vec<String> = model
            .field_catalog(&patient)
            .unwrap()
            .into_iter()
            .map(|field| field.name)
            .collect();
        assert_eq!(names, ["telecom", "birthDate", "address", "contact"]);
    }

    #[test]
    fn test_remove_keeps_remaining_field_order() {
        let model = FhirJsonModel::default();
        let mut node = json!({ "id": "1", "gender": "male", "active": true });

        assert!(model.remove_value(
            &mut node,
            &FieldDescriptor::new("id", Cardinality::Singleton),
            0
        ));
        let keys: Vec<&String> = node.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["gender", "active"]);
    }

    #[test]
    fn test_is_empty() {
        let model = FhirJsonModel::default();
        assert!(model.is_empty(&json!({})));
        assert!(!model.is_empty(&json!({ "start": "1970" })));
        assert!(!model.is_empty(&json!([])));
    }

    #[test]
    fn test_remove_repeated_value_keeps_order() {
        let model = FhirJsonModel::default();
        let mut node = json!({ "given": ["A", "B", "C"] });
        let field = FieldDescriptor::new("given", Cardinality::Repeated);

        assert!(model.remove_value(&mut node, &field, 1));
        assert_eq!(node, json!({ "given": ["A", "C"] }));
    }

    #[test]
    fn test_remove_last_repeated_value_drops_field() {
        let model = FhirJsonModel::default();
        let mut node = json!({ "telecom": [{ "value": "1" }], "active": true });
        let field = FieldDescriptor::new("telecom", Cardinality::Repeated);

        assert!(model.remove_value(&mut node, &field, 0));
        assert_eq!(node, json!({ "active": true }));
    }

    #[test]
    fn test_remove_singleton_drops_extension_sibling() {
        let model = FhirJsonModel::default();
        let mut node = json!({
            "birthDate": "1970-01-01",
            "_birthDate": { "extension": [{ "url": "http://example.org/precision" }] },
            "active": true
        });
        let field = FieldDescriptor::new("birthDate", Cardinality::Singleton);

        assert!(model.remove_value(&mut node, &field, 0));
        assert_eq!(node, json!({ "active": true }));
    }

    #[test]
    fn test_remove_out_of_range() {
        let model = FhirJsonModel::default();
        let mut node = json!({ "given": ["A"], "gender": "male" });

        assert!(!model.remove_value(
            &mut node,
            &FieldDescriptor::new("given", Cardinality::Repeated),
            3
        ));
        assert!(!model.remove_value(
            &mut node,
            &FieldDescriptor::new("gender", Cardinality::Singleton),
            1
        ));
        assert_eq!(node, json!({ "given": ["A"], "gender": "male" }));
    }
}
