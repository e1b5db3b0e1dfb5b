//! In-memory graph accumulator with dedup and merge rules.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::trace;

use crate::kind::{EdgeKind, NodeKind};
use crate::model::{Edge, Endpoint, GraphData, GraphDocument, Node, Properties};

/// Conflict policy for property keys present in both graphs during
/// [`GraphStore::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Keep the target's value for conflicting keys; only keys absent in the
    /// target are copied from the other graph (first source wins).
    #[default]
    PreferExisting,
    /// Overwrite the target's value for every key the other graph supplies,
    /// matching `ensure_node`'s own last-write-wins rule.
    PreferIncoming,
}

/// Node/edge accumulator keyed by canonical ids.
///
/// Invariants held across a run:
/// - a node's kind set equals the union of all normalized kinds ever supplied
///   for its id, with no duplicates;
/// - a property key's final value is the value from the last call supplying
///   that key; omitting a key never clears it;
/// - edges with equal (kind, start, end, canonicalized properties) collapse
///   to the first insertion, preserving insertion order for the rest.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
    edge_keys: HashSet<String>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update the node identified by `id`.
    ///
    /// Kinds are unioned after normalization through [`NodeKind::label`], so
    /// a kind can never be added twice under different spellings. Each key
    /// present in `properties` overwrites the stored value for that key;
    /// absent keys are left untouched. Callers that cannot supply an
    /// authoritative value for a descriptive field must omit the key rather
    /// than pass a placeholder.
    pub fn ensure_node(
        &mut self,
        kinds: &[NodeKind],
        id: impl Into<String>,
        properties: Properties,
    ) -> &mut Node {
        let labels: Vec<String> = kinds.iter().map(|k| k.label()).collect();
        self.ensure_node_raw(labels, id, properties)
    }

    /// `ensure_node` over already-formatted kind labels, used when
    /// re-ingesting a previously exported document.
    pub fn ensure_node_raw(
        &mut self,
        kinds: Vec<String>,
        id: impl Into<String>,
        properties: Properties,
    ) -> &mut Node {
        let id = id.into();
        let node = self.nodes.entry(id.clone()).or_insert_with(|| {
            trace!(id = %id, "creating node");
            Node {
                kinds: Vec::new(),
                id,
                properties: Properties::new(),
            }
        });
        for label in kinds {
            if !node.kinds.contains(&label) {
                node.kinds.push(label);
            }
        }
        for (key, value) in properties {
            node.properties.insert(key, value);
        }
        node
    }

    /// Append an edge between two node ids, deduplicated on
    /// (kind, start, end, canonicalized properties). A repeated insertion is
    /// a silent no-op, not an error.
    pub fn add_edge(
        &mut self,
        kind: EdgeKind,
        start: impl Into<String>,
        end: impl Into<String>,
        properties: Properties,
    ) {
        self.push_edge(Edge {
            kind: kind.label(),
            start: Endpoint::id(start),
            end: Endpoint::id(end),
            properties,
        });
    }

    /// Append an edge with explicit endpoints, used for foreign-id joins
    /// where an endpoint is resolved by the consumer through `match_by`.
    pub fn add_edge_matched(
        &mut self,
        kind: EdgeKind,
        start: Endpoint,
        end: Endpoint,
        properties: Properties,
    ) {
        self.push_edge(Edge {
            kind: kind.label(),
            start,
            end,
            properties,
        });
    }

    /// Append an already-formatted edge, used when re-ingesting a previously
    /// exported document. Dedup applies all the same.
    pub fn add_edge_raw(&mut self, edge: Edge) {
        self.push_edge(edge);
    }

    fn push_edge(&mut self, edge: Edge) {
        let key = edge_key(&edge);
        if !self.edge_keys.insert(key) {
            return;
        }
        self.edges.push(edge);
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether a node with this id exists.
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes, ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Fold another independently collected graph into this one.
    ///
    /// Nodes present only in `other` are copied verbatim. For nodes present
    /// in both, kinds are unioned and conflicting property keys follow
    /// `policy`. Edges from `other` pass through the same dedup key check as
    /// direct insertions, so duplicates across sources collapse.
    pub fn merge(&mut self, other: GraphStore, policy: MergePolicy) {
        for (id, incoming) in other.nodes {
            match self.nodes.get_mut(&id) {
                None => {
                    self.nodes.insert(id, incoming);
                }
                Some(existing) => {
                    for label in incoming.kinds {
                        if !existing.kinds.contains(&label) {
                            existing.kinds.push(label);
                        }
                    }
                    for (key, value) in incoming.properties {
                        match policy {
                            MergePolicy::PreferExisting => {
                                existing.properties.entry(key).or_insert(value);
                            }
                            MergePolicy::PreferIncoming => {
                                existing.properties.insert(key, value);
                            }
                        }
                    }
                }
            }
        }
        for edge in other.edges {
            self.push_edge(edge);
        }
    }

    /// Rebuild a store from a previously exported document, keeping the
    /// already-formatted kind labels as-is.
    pub fn from_document(doc: GraphDocument) -> Self {
        let mut store = GraphStore::new();
        for node in doc.graph.nodes {
            store.ensure_node_raw(node.kinds, node.id, node.properties);
        }
        for edge in doc.graph.edges {
            store.add_edge_raw(edge);
        }
        store
    }

    /// Export the accumulated graph. Nodes are ordered by id for
    /// deterministic output; edges keep insertion order.
    pub fn into_document(self) -> GraphDocument {
        GraphDocument {
            graph: GraphData {
                nodes: self.nodes.into_values().collect(),
                edges: self.edges,
            },
        }
    }
}

/// Dedup key: kind, endpoints and a canonical serialization of the
/// properties, independent of map iteration order.
fn edge_key(edge: &Edge) -> String {
    let mut key = String::new();
    key.push_str(&edge.kind);
    key.push(':');
    push_endpoint(&mut key, &edge.start);
    key.push(':');
    push_endpoint(&mut key, &edge.end);
    key.push(':');
    key.push_str(&canonical_properties(&edge.properties));
    key
}

fn push_endpoint(key: &mut String, endpoint: &Endpoint) {
    key.push_str(&endpoint.value);
    if let Some(match_by) = &endpoint.match_by {
        key.push('@');
        key.push_str(match_by);
    }
}

/// Deterministic property serialization: entries sorted by key, values
/// rendered with nested object keys sorted recursively.
fn canonical_properties(properties: &Properties) -> String {
    if properties.is_empty() {
        return String::new();
    }
    let mut keys: Vec<&String> = properties.keys().collect();
    keys.sort();
    let parts: Vec<String> = keys
        .into_iter()
        .map(|k| format!("{}:{}", k, canonical_value(&properties[k])))
        .collect();
    parts.join("|")
}

fn canonical_value(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_value).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", k, canonical_value(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(entries: &[(&str, Value)]) -> Properties {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn kinds_union_without_duplicates() {
        let mut store = GraphStore::new();
        store.ensure_node(&[NodeKind::Folder], "folder:vc01:group-d1", Properties::new());
        store.ensure_node(
            &[NodeKind::RootFolder, NodeKind::Folder],
            "folder:vc01:group-d1",
            Properties::new(),
        );
        store.ensure_node(&[NodeKind::Folder], "folder:vc01:group-d1", Properties::new());

        let node = store.node("folder:vc01:group-d1").unwrap();
        assert_eq!(
            node.kinds,
            vec!["vCenter_Folder".to_string(), "vCenter_RootFolder".to_string()]
        );
    }

    #[test]
    fn property_overwrite_is_last_write_wins_per_key() {
        let mut store = GraphStore::new();
        store.ensure_node(
            &[NodeKind::Vm],
            "vm:vc01:vm-1",
            props(&[("name", json!("web01")), ("moid", json!("vm-1"))]),
        );
        store.ensure_node(
            &[NodeKind::Vm],
            "vm:vc01:vm-1",
            props(&[("name", json!("web01-renamed"))]),
        );

        let node = store.node("vm:vc01:vm-1").unwrap();
        assert_eq!(node.property_str("name"), Some("web01-renamed"));
        // An omitted key is never cleared.
        assert_eq!(node.property_str("moid"), Some("vm-1"));
    }

    #[test]
    fn edge_dedup_is_independent_of_property_order() {
        let mut store = GraphStore::new();
        store.add_edge(
            EdgeKind::HasPermission,
            "user:vc01:a",
            "vm:vc01:vm-1",
            props(&[("roleId", json!(5)), ("propagate", json!(true))]),
        );
        store.add_edge(
            EdgeKind::HasPermission,
            "user:vc01:a",
            "vm:vc01:vm-1",
            props(&[("propagate", json!(true)), ("roleId", json!(5))]),
        );
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn propagate_differing_edges_stay_distinct() {
        let mut store = GraphStore::new();
        store.add_edge(
            EdgeKind::HasPermission,
            "user:vc01:a",
            "vm:vc01:vm-1",
            props(&[("roleId", json!(5)), ("propagate", json!(true))]),
        );
        store.add_edge(
            EdgeKind::HasPermission,
            "user:vc01:a",
            "vm:vc01:vm-1",
            props(&[("roleId", json!(5)), ("propagate", json!(false))]),
        );
        assert_eq!(store.edge_count(), 2);
    }

    #[test]
    fn nested_property_values_canonicalize() {
        let mut store = GraphStore::new();
        store.add_edge(
            EdgeKind::HasPermission,
            "a",
            "b",
            props(&[("detail", json!({"x": 1, "y": [1, 2]}))]),
        );
        store.add_edge(
            EdgeKind::HasPermission,
            "a",
            "b",
            props(&[("detail", json!({"y": [1, 2], "x": 1}))]),
        );
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn duplicate_edge_is_silent_noop_preserving_order() {
        let mut store = GraphStore::new();
        store.add_edge(EdgeKind::Contains, "a", "b", Properties::new());
        store.add_edge(EdgeKind::Contains, "b", "c", Properties::new());
        store.add_edge(EdgeKind::Contains, "a", "b", Properties::new());
        let kinds: Vec<(&str, &str)> = store
            .edges()
            .iter()
            .map(|e| (e.start.value.as_str(), e.end.value.as_str()))
            .collect();
        assert_eq!(kinds, vec![("a", "b"), ("b", "c")]);
    }

    #[test]
    fn merge_prefer_existing_keeps_target_values() {
        let mut target = GraphStore::new();
        target.ensure_node(
            &[NodeKind::Vm],
            "vm:vc01:vm-1",
            props(&[("name", json!("authoritative"))]),
        );

        let mut other = GraphStore::new();
        other.ensure_node(
            &[NodeKind::Vm],
            "vm:vc01:vm-1",
            props(&[("name", json!("late")), ("moid", json!("vm-1"))]),
        );
        other.ensure_node(&[NodeKind::Datastore], "datastore:vc01:ds-1", Properties::new());

        target.merge(other, MergePolicy::PreferExisting);

        let node = target.node("vm:vc01:vm-1").unwrap();
        assert_eq!(node.property_str("name"), Some("authoritative"));
        assert_eq!(node.property_str("moid"), Some("vm-1"));
        assert!(target.contains_node("datastore:vc01:ds-1"));
    }

    #[test]
    fn merge_prefer_incoming_overwrites_supplied_keys() {
        let mut target = GraphStore::new();
        target.ensure_node(
            &[NodeKind::Vm],
            "vm:vc01:vm-1",
            props(&[("name", json!("old")), ("moid", json!("vm-1"))]),
        );

        let mut other = GraphStore::new();
        other.ensure_node(&[NodeKind::Vm], "vm:vc01:vm-1", props(&[("name", json!("new"))]));

        target.merge(other, MergePolicy::PreferIncoming);

        let node = target.node("vm:vc01:vm-1").unwrap();
        assert_eq!(node.property_str("name"), Some("new"));
        assert_eq!(node.property_str("moid"), Some("vm-1"));
    }

    #[test]
    fn merge_runs_edges_through_dedup() {
        let mut target = GraphStore::new();
        target.add_edge(EdgeKind::Contains, "a", "b", Properties::new());

        let mut other = GraphStore::new();
        other.add_edge(EdgeKind::Contains, "a", "b", Properties::new());
        other.add_edge(EdgeKind::Contains, "b", "c", Properties::new());

        target.merge(other, MergePolicy::PreferExisting);
        assert_eq!(target.edge_count(), 2);
    }

    #[test]
    fn reingested_document_round_trips() {
        let mut store = GraphStore::new();
        store.ensure_node(
            &[NodeKind::User],
            "user:vc01:CORP\\jdoe",
            props(&[("name", json!("CORP\\jdoe"))]),
        );
        store.add_edge(
            EdgeKind::MemberOf,
            "user:vc01:CORP\\jdoe",
            "group:vc01:CORP\\admins",
            Properties::new(),
        );

        let doc = store.into_document();
        let rebuilt = GraphStore::from_document(doc.clone());
        assert_eq!(rebuilt.into_document(), doc);
    }

    #[test]
    fn export_orders_nodes_by_id() {
        let mut store = GraphStore::new();
        store.ensure_node(&[NodeKind::Vm], "vm:vc01:vm-2", Properties::new());
        store.ensure_node(&[NodeKind::Vm], "vm:vc01:vm-1", Properties::new());
        let doc = store.into_document();
        let ids: Vec<&str> = doc.graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["vm:vc01:vm-1", "vm:vc01:vm-2"]);
    }
}
