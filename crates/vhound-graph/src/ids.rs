//! Canonical entity-identity scheme.
//!
//! Pure mapping from (kind, source host, native object id) to the string id
//! that keys every node in the store. Identical inputs always yield identical
//! output; distinct native ids under the same (kind, host) never collide
//! because the native id is the final colon-delimited component.

use crate::kind::NodeKind;

/// Canonical id for an inventory or directory object within one source.
pub fn entity_id(kind: NodeKind, source_host: &str, native_id: &str) -> String {
    format!("{}:{}:{}", kind.id_prefix(), source_host, native_id)
}

/// Canonical id for the vCenter root node itself. The source host IS the
/// native identity here, so the id has only two components.
pub fn vcenter_id(source_host: &str) -> String {
    format!("vcenter:{source_host}")
}
