//! One-level group-membership expansion.
//!
//! For every group principal holding at least one permission edge, queries
//! the user directory for direct user members and direct group members in
//! each reported domain. Exactly one level per (group, domain) pair;
//! transitive closure is not orchestrated here.

use std::collections::BTreeSet;

use serde_json::json;
use tracing::{info, warn};

use vhound_graph::{entity_id, EdgeKind, GraphStore, NodeKind, Properties};

use crate::error::CollectorResult;
use crate::traits::DirectoryOps;
use crate::types::ParsedPrincipal;

/// Resolve direct memberships for `groups` into the store.
pub async fn resolve<S>(
    source: &S,
    store: &mut GraphStore,
    groups: &BTreeSet<String>,
) -> CollectorResult<()>
where
    S: DirectoryOps + ?Sized,
{
    if groups.is_empty() {
        return Ok(());
    }
    let host = source.source_host().to_string();
    let domains = source.domain_list().await?;
    info!(
        host = %host,
        groups = groups.len(),
        domains = domains.len(),
        "resolving group memberships"
    );

    for group in groups {
        let group_id = entity_id(NodeKind::Group, &host, group);

        for domain in &domains {
            expand(source, store, &host, group, domain, &group_id).await;
        }

        // A domain-qualified group may be indexed unqualified in some
        // directories; retry with the bare name against every domain.
        if let Some((_, bare_name)) = group.split_once('\\') {
            for domain in &domains {
                expand(source, store, &host, bare_name, domain, &group_id).await;
            }
        }
    }
    Ok(())
}

/// Run the two one-level queries (users, then nested groups) for one
/// (group, domain) pair. Query failure is logged and never aborts the rest.
async fn expand<S>(
    source: &S,
    store: &mut GraphStore,
    host: &str,
    group: &str,
    domain: &str,
    group_id: &str,
) where
    S: DirectoryOps + ?Sized,
{
    for find_users in [true, false] {
        match source.group_members(group, domain, find_users).await {
            Ok(members) => {
                for principal in members {
                    add_member(store, host, &principal, find_users, group_id);
                }
            }
            Err(err) => {
                warn!(
                    group = group,
                    domain = domain,
                    find_users = find_users,
                    error = %err,
                    "directory query failed"
                );
            }
        }
    }
}

fn add_member(store: &mut GraphStore, host: &str, principal: &str, is_user: bool, group_id: &str) {
    let kind = if is_user {
        NodeKind::User
    } else {
        NodeKind::Group
    };
    let member_id = entity_id(kind, host, principal);
    let parsed = ParsedPrincipal::parse(principal);
    store.ensure_node(
        &[kind],
        &member_id,
        Properties::from_iter([
            ("name".to_string(), json!(principal)),
            ("domain".to_string(), json!(parsed.domain)),
            ("username".to_string(), json!(parsed.username)),
            ("isGroup".to_string(), json!(!is_user)),
        ]),
    );
    store.add_edge(EdgeKind::MemberOf, member_id, group_id, Properties::new());
}
