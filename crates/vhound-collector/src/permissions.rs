//! Role, privilege and permission-assignment resolution.
//!
//! Loads the static role and privilege tables once per source, emits their
//! nodes and `HasPrivilege` edges, then resolves every permission assignment
//! into a principal node, a target entity node and a `HasPermission` edge.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use vhound_graph::{entity_id, EdgeKind, GraphStore, NodeKind, Properties};

use crate::error::CollectorResult;
use crate::traits::{AuthorizationOps, InventoryOps};
use crate::types::{AuthPrivilege, AuthRole, ObjectRef, ParsedPrincipal, PermissionAssignment};

/// What permission resolution learned, consumed by membership resolution.
#[derive(Debug, Default)]
pub struct PermissionOutcome {
    /// Principal strings of every group holding at least one permission
    /// edge, in deterministic order.
    pub groups_with_permissions: BTreeSet<String>,
}

/// Resolve the source's authorization model into the store.
pub async fn resolve<S>(source: &S, store: &mut GraphStore) -> CollectorResult<PermissionOutcome>
where
    S: InventoryOps + AuthorizationOps + ?Sized,
{
    let host = source.source_host().to_string();

    let privileges: BTreeMap<String, AuthPrivilege> = source
        .privilege_list()
        .await?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();
    let roles: BTreeMap<i32, AuthRole> = source
        .role_list()
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    emit_privilege_nodes(store, &host, &privileges);
    emit_role_nodes(store, &host, &roles, &privileges);

    let assignments = match source.all_permissions().await {
        Ok(assignments) => assignments,
        Err(err) => {
            // The static tables are already in the graph; assignments are
            // the only loss.
            warn!(error = %err, "failed to retrieve permission assignments");
            Vec::new()
        }
    };
    info!(
        host = %host,
        privileges = privileges.len(),
        roles = roles.len(),
        assignments = assignments.len(),
        "resolving authorization model"
    );

    let mut outcome = PermissionOutcome::default();
    for assignment in assignments {
        if let Err(err) = process_assignment(
            source,
            store,
            &host,
            &assignment,
            &roles,
            &privileges,
            &mut outcome,
        )
        .await
        {
            warn!(principal = %assignment.principal, error = %err, "skipping permission assignment");
        }
    }
    Ok(outcome)
}

fn emit_privilege_nodes(
    store: &mut GraphStore,
    host: &str,
    privileges: &BTreeMap<String, AuthPrivilege>,
) {
    for privilege in privileges.values() {
        let id = entity_id(NodeKind::Privilege, host, &privilege.id);
        store.ensure_node(
            &[NodeKind::Privilege],
            id,
            Properties::from_iter([
                ("privId".to_string(), json!(privilege.id)),
                ("name".to_string(), json!(privilege.name)),
                ("group".to_string(), json!(privilege.group)),
            ]),
        );
    }
}

fn emit_role_nodes(
    store: &mut GraphStore,
    host: &str,
    roles: &BTreeMap<i32, AuthRole>,
    privileges: &BTreeMap<String, AuthPrivilege>,
) {
    for role in roles.values() {
        let role_id = entity_id(NodeKind::Role, host, &role.id.to_string());

        let mut groups: BTreeSet<&str> = BTreeSet::new();
        for priv_id in &role.privileges {
            if let Some(privilege) = privileges.get(priv_id) {
                groups.insert(privilege.group.as_str());
                let priv_node = entity_id(NodeKind::Privilege, host, priv_id);
                store.add_edge(
                    EdgeKind::HasPrivilege,
                    &role_id,
                    priv_node,
                    Properties::new(),
                );
            }
        }

        let group_list: Vec<Value> = groups.into_iter().map(|g| json!(g)).collect();
        store.ensure_node(
            &[NodeKind::Role],
            &role_id,
            Properties::from_iter([
                ("roleId".to_string(), json!(role.id)),
                ("name".to_string(), json!(role.name)),
                ("privilegeCount".to_string(), json!(role.privileges.len())),
                ("privilegeGroups".to_string(), Value::Array(group_list)),
            ]),
        );
    }
}

async fn process_assignment<S>(
    source: &S,
    store: &mut GraphStore,
    host: &str,
    assignment: &PermissionAssignment,
    roles: &BTreeMap<i32, AuthRole>,
    privileges: &BTreeMap<String, AuthPrivilege>,
    outcome: &mut PermissionOutcome,
) -> CollectorResult<()>
where
    S: InventoryOps + ?Sized,
{
    let role_name = roles
        .get(&assignment.role_id)
        .map(|r| r.name.as_str())
        .unwrap_or("");

    // A no-access assignment revokes rather than grants: drop it before any
    // node mutation.
    if is_no_access(role_name) {
        debug!(principal = %assignment.principal, "dropping no-access assignment");
        return Ok(());
    }

    let principal_kind = if assignment.is_group {
        NodeKind::Group
    } else {
        NodeKind::User
    };
    let principal_id = entity_id(principal_kind, host, &assignment.principal);
    let parsed = ParsedPrincipal::parse(&assignment.principal);
    store.ensure_node(
        &[principal_kind],
        &principal_id,
        Properties::from_iter([
            ("name".to_string(), json!(assignment.principal)),
            ("isGroup".to_string(), json!(assignment.is_group)),
            ("domain".to_string(), json!(parsed.domain)),
            ("username".to_string(), json!(parsed.username)),
        ]),
    );

    let Some(entity_ref) = &assignment.entity else {
        return Ok(());
    };
    let Some((entity_kind, target_id)) = resolve_entity(source, host, entity_ref).await? else {
        return Ok(());
    };

    // Placeholder contract: when the entity has not been observed yet, its
    // name is the native id and nothing more. When it already exists we add
    // only the moid hint and must not touch its display name.
    let mut entity_props = Properties::new();
    entity_props.insert("moid".to_string(), json!(entity_ref.moid));
    if !store.contains_node(&target_id) {
        entity_props.insert("name".to_string(), json!(entity_ref.moid));
    }
    store.ensure_node(&[entity_kind], &target_id, entity_props);

    let detail = role_detail(assignment, role_name, roles, privileges);
    store.add_edge(EdgeKind::HasPermission, &principal_id, &target_id, detail);

    if assignment.is_group {
        outcome
            .groups_with_permissions
            .insert(assignment.principal.clone());
    }
    Ok(())
}

/// Aggregate the edge properties for one assignment: the role's full
/// privilege-id list, resolved display names (raw id as fallback) and the
/// distinct privilege-group names sorted lexicographically.
fn role_detail(
    assignment: &PermissionAssignment,
    role_name: &str,
    roles: &BTreeMap<i32, AuthRole>,
    privileges: &BTreeMap<String, AuthPrivilege>,
) -> Properties {
    let mut priv_ids: Vec<Value> = Vec::new();
    let mut priv_names: Vec<Value> = Vec::new();
    let mut group_set: BTreeSet<&str> = BTreeSet::new();
    let mut priv_count = 0usize;

    if let Some(role) = roles.get(&assignment.role_id) {
        priv_count = role.privileges.len();
        for priv_id in &role.privileges {
            priv_ids.push(json!(priv_id));
            match privileges.get(priv_id) {
                Some(privilege) => {
                    priv_names.push(json!(privilege.name));
                    group_set.insert(privilege.group.as_str());
                }
                None => priv_names.push(json!(priv_id)),
            }
        }
    }
    let groups: Vec<Value> = group_set.into_iter().map(|g| json!(g)).collect();

    Properties::from_iter([
        ("roleId".to_string(), json!(assignment.role_id)),
        ("roleName".to_string(), json!(role_name)),
        ("propagate".to_string(), json!(assignment.propagate)),
        ("privilegeIds".to_string(), Value::Array(priv_ids)),
        ("privilegeNames".to_string(), Value::Array(priv_names)),
        ("privilegeGroups".to_string(), Value::Array(groups)),
        ("privilegeCount".to_string(), json!(priv_count)),
    ])
}

/// Resolve a permission target to its node kind and canonical id.
///
/// A compute-resource wrapper resolves to the host it contains: a standalone
/// host has no separate compute-resource node. When the host list cannot be
/// read the wrapper's own native id is used under the host prefix. A native
/// type outside the closed kind set yields `None` and the assignment is
/// skipped.
async fn resolve_entity<S>(
    source: &S,
    host: &str,
    entity: &ObjectRef,
) -> CollectorResult<Option<(NodeKind, String)>>
where
    S: InventoryOps + ?Sized,
{
    if entity.kind == "ComputeResource" {
        let native_id = match source.retrieve(entity, &["host"]).await {
            Ok(bag) => bag
                .refs("host")
                .first()
                .map(|h| h.moid.clone())
                .unwrap_or_else(|| entity.moid.clone()),
            Err(err) => {
                warn!(object = %entity, error = %err, "could not resolve compute-resource hosts");
                entity.moid.clone()
            }
        };
        return Ok(Some((
            NodeKind::EsxiHost,
            entity_id(NodeKind::EsxiHost, host, &native_id),
        )));
    }

    match NodeKind::from_native(&entity.kind) {
        Some(kind) => Ok(Some((kind, entity_id(kind, host, &entity.moid)))),
        None => {
            warn!(native = %entity.kind, object = %entity, "unmapped permission target type, skipping");
            Ok(None)
        }
    }
}

/// Case-folded, punctuation-stripped comparison covering "No Access",
/// "NoAccess" and "no-access" alike.
fn is_no_access(role_name: &str) -> bool {
    let folded: String = role_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    folded == "noaccess"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_access_variants_are_recognized() {
        for name in ["No Access", "NoAccess", "no-access", "NOACCESS", "nO acCESS"] {
            assert!(is_no_access(name), "{name} should be no-access");
        }
        for name in ["Admin", "ReadOnly", "", "no access granted"] {
            assert!(!is_no_access(name), "{name} should not be no-access");
        }
    }
}
