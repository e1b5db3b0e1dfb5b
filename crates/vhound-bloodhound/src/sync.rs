//! Domain sync: join collected principals to BloodHound AD objects.
//!
//! For every user or group node whose domain fragment matches a domain the
//! BloodHound instance knows about, emits a sync edge whose start endpoint
//! is the foreign principal id `UPPER(user)@FQDN` resolved by the consumer
//! through the `name` join key. The foreign object is never materialized as
//! a local node.

use std::collections::BTreeMap;

use tracing::{debug, info};

use vhound_graph::{EdgeKind, Endpoint, GraphStore, NodeKind, Properties};

/// Join key the consumer resolves foreign endpoints by.
const MATCH_KEY: &str = "name";

/// Resolves principal nodes against a BloodHound domain table.
#[derive(Debug, Clone)]
pub struct DomainSyncResolver {
    /// Uppercased short name or FQDN to uppercased FQDN.
    domains: BTreeMap<String, String>,
}

impl DomainSyncResolver {
    pub fn new(domains: BTreeMap<String, String>) -> Self {
        Self { domains }
    }

    /// Add sync edges for every matching principal in `store`. Returns the
    /// number of edges requested; edge dedup may keep the stored count lower
    /// on re-runs.
    pub fn resolve(&self, store: &mut GraphStore) -> usize {
        let mut pending: Vec<(EdgeKind, String, String)> = Vec::new();

        for node in store.nodes() {
            let kind = if node.has_kind(NodeKind::User) {
                EdgeKind::SyncsToUser
            } else if node.has_kind(NodeKind::Group) {
                EdgeKind::SyncsToGroup
            } else {
                continue;
            };

            let Some(domain) = non_empty(node.property_str("domain")) else {
                continue;
            };
            let Some(username) = non_empty(node.property_str("username")) else {
                continue;
            };

            let Some(fqdn) = self.domains.get(&domain.to_uppercase()) else {
                debug!(domain = domain, "principal domain not known to bloodhound");
                continue;
            };
            let foreign = format!("{}@{fqdn}", username.to_uppercase());
            pending.push((kind, foreign, node.id.clone()));
        }

        let count = pending.len();
        for (kind, foreign, node_id) in pending {
            store.add_edge_matched(
                kind,
                Endpoint::matched(foreign, MATCH_KEY),
                Endpoint::id(node_id),
                Properties::new(),
            );
        }
        info!(edges = count, "domain sync complete");
        count
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
