//! vhound Graph Library
//!
//! In-memory property-graph accumulator with idempotent node/edge merge
//! semantics, plus the OpenGraph JSON document shape consumed by BloodHound.
//!
//! # Modules
//!
//! - [`kind`] - Closed node/edge label enumerations with formatting rules
//! - [`ids`] - Canonical entity-identity scheme
//! - [`model`] - Node, edge and document types (serde shapes)
//! - [`store`] - [`GraphStore`]: dedup, merge and export
//! - [`sanitize`] - Property-value sanitization applied before serialization
//! - [`writer`] - BOM-prefixed UTF-8 JSON file I/O
//! - [`error`] - Error types ([`GraphError`])

pub mod error;
pub mod ids;
pub mod kind;
pub mod model;
pub mod sanitize;
pub mod store;
pub mod writer;

pub use error::{GraphError, GraphResult};
pub use ids::{entity_id, vcenter_id};
pub use kind::{EdgeKind, NodeKind};
pub use model::{Edge, Endpoint, GraphData, GraphDocument, Node, Properties};
pub use store::{GraphStore, MergePolicy};
pub use writer::{read_graph, write_graph};
