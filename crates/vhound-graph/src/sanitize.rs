//! Property-value sanitization applied before serialization.
//!
//! The consumer rejects null property values, so absent/null becomes the
//! empty string; sequences and nested mappings are sanitized recursively.

use serde_json::Value;

use crate::model::{GraphDocument, Properties};

/// Sanitize every node and edge property map in the document.
pub fn sanitize_document(doc: &mut GraphDocument) {
    for node in &mut doc.graph.nodes {
        sanitize_properties(&mut node.properties);
    }
    for edge in &mut doc.graph.edges {
        sanitize_properties(&mut edge.properties);
    }
}

/// Sanitize one property map in place.
pub fn sanitize_properties(properties: &mut Properties) {
    for (_, value) in properties.iter_mut() {
        sanitize_value(value);
    }
}

fn sanitize_value(value: &mut Value) {
    match value {
        Value::Null => *value = Value::String(String::new()),
        Value::Array(items) => {
            for item in items {
                sanitize_value(item);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                sanitize_value(item);
            }
        }
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}
