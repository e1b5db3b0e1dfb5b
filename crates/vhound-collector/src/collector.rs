//! Per-source orchestration.
//!
//! Runs the three collection phases sequentially against one source:
//! infrastructure traversal, permission resolution, membership resolution.
//! A failing phase is logged and the remaining phases still run, so a
//! partially reachable source still contributes everything it can.

use tracing::{info, warn};

use vhound_graph::GraphStore;

use crate::error::CollectorResult;
use crate::traits::{AuthorizationOps, DirectoryOps, InventoryOps};
use crate::{infrastructure, membership, permissions};

/// Collect everything one source offers into `store`.
///
/// The caller owns connection setup and teardown; a connection-level
/// failure before this point is fatal for the source and never reaches
/// here.
pub async fn collect_source<S>(source: &S, store: &mut GraphStore) -> CollectorResult<()>
where
    S: InventoryOps + AuthorizationOps + DirectoryOps + ?Sized,
{
    let host = source.source_host().to_string();
    info!(host = %host, "collecting infrastructure");
    if let Err(err) = infrastructure::collect(source, store).await {
        warn!(host = %host, error = %err, "infrastructure collection incomplete");
    }

    info!(host = %host, "collecting permissions");
    let outcome = match permissions::resolve(source, store).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(host = %host, error = %err, "permission collection incomplete");
            Default::default()
        }
    };

    info!(host = %host, "collecting group memberships");
    if let Err(err) = membership::resolve(source, store, &outcome.groups_with_permissions).await {
        warn!(host = %host, error = %err, "membership collection incomplete");
    }

    info!(
        host = %host,
        nodes = store.node_count(),
        edges = store.edge_count(),
        "source collection finished"
    );
    Ok(())
}
