//! Node, edge and document types.
//!
//! These structs are the serde shapes of the final JSON document:
//! `{"graph": {"nodes": [...], "edges": [...]}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::NodeKind;

/// Property map carried by nodes and edges.
pub type Properties = serde_json::Map<String, Value>;

/// A node in the output graph.
///
/// The id is immutable once created; kinds grow monotonically and never
/// shrink; property keys are independently overwritable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kinds: Vec<String>,
    pub id: String,
    pub properties: Properties,
}

impl Node {
    /// Whether this node carries the formatted label of `kind`.
    pub fn has_kind(&self, kind: NodeKind) -> bool {
        let label = kind.label();
        self.kinds.iter().any(|k| *k == label)
    }

    /// A string property, if present and non-null.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// One end of an edge.
///
/// `value` is a node id in this graph unless `match_by` names a declared
/// join key, in which case the consumer resolves the endpoint against its
/// own nodes by that property and the node is never locally materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub match_by: Option<String>,
}

impl Endpoint {
    /// Endpoint referencing a node id in this graph.
    pub fn id(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            match_by: None,
        }
    }

    /// Endpoint resolved by the consumer through a declared join key.
    pub fn matched(value: impl Into<String>, match_by: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            match_by: Some(match_by.into()),
        }
    }
}

/// An edge in the output graph. Immutable once inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub kind: String,
    pub start: Endpoint,
    pub end: Endpoint,
    pub properties: Properties,
}

/// Accumulated nodes and edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Root object of the output document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub graph: GraphData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_match_by_is_omitted_when_absent() {
        let plain = serde_json::to_value(Endpoint::id("vm:vc01:vm-1")).unwrap();
        assert_eq!(plain, json!({"value": "vm:vc01:vm-1"}));

        let matched = serde_json::to_value(Endpoint::matched("ADMIN@CORP.LOCAL", "name")).unwrap();
        assert_eq!(
            matched,
            json!({"value": "ADMIN@CORP.LOCAL", "match_by": "name"})
        );
    }

    #[test]
    fn node_kind_check_uses_formatted_label() {
        let node = Node {
            kinds: vec!["vCenter_User".to_string()],
            id: "user:vc01:CORP\\jdoe".to_string(),
            properties: Properties::new(),
        };
        assert!(node.has_kind(NodeKind::User));
        assert!(!node.has_kind(NodeKind::Group));
    }

    #[test]
    fn document_round_trips() {
        let doc = GraphDocument {
            graph: GraphData {
                nodes: vec![Node {
                    kinds: vec!["vCenter_VM".to_string()],
                    id: "vm:vc01:vm-1".to_string(),
                    properties: Properties::from_iter([("name".to_string(), json!("web01"))]),
                }],
                edges: vec![],
            },
        };
        let text = serde_json::to_string(&doc).unwrap();
        let back: GraphDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(doc, back);
    }
}
