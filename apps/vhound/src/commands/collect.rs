//! Collect command - gather one or more vCenter servers into a document.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use tracing::{debug, info, warn};

use vhound_collector::{collect_source, Source};
use vhound_graph::{write_graph, GraphStore, MergePolicy};
use vhound_vim::{VimClient, VimConfig};

use crate::commands::sync::{self, BloodHoundArgs};
use crate::error::{CliError, CliResult};

/// Arguments for the collect command
#[derive(Args)]
pub struct CollectArgs {
    /// vCenter server hostname; repeat for multiple servers
    #[arg(long = "server", required = true)]
    pub servers: Vec<String>,

    /// Username for all servers
    #[arg(long, short = 'u', env = "VHOUND_USERNAME")]
    pub username: String,

    /// Password for all servers
    #[arg(long, short = 'p', env = "VHOUND_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// API port
    #[arg(long, default_value_t = 443)]
    pub port: u16,

    /// Skip TLS certificate verification for vCenter
    #[arg(long)]
    pub insecure: bool,

    /// Output file path
    #[arg(long, short = 'o', default_value = "vcenter_graph.json")]
    pub output: PathBuf,

    #[command(flatten)]
    pub bloodhound: BloodHoundArgs,
}

/// Execute the collect command
pub async fn execute(args: CollectArgs) -> CliResult<()> {
    let mut combined = GraphStore::new();
    let mut collected = 0usize;

    for server in &args.servers {
        let config = VimConfig {
            host: server.clone(),
            port: args.port,
            username: args.username.clone(),
            password: args.password.clone(),
            insecure: args.insecure,
            timeout_secs: 60,
        };

        info!(server = %server, "connecting");
        let client = match VimClient::connect(config).await {
            Ok(client) => client,
            Err(err) if args.servers.len() > 1 => {
                // One unreachable server must not cost the others' data.
                warn!(server = %server, error = %err, "skipping server");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let mut store = GraphStore::new();
        collect_source(&client, &mut store).await?;
        client.disconnect().await?;

        info!(
            server = %server,
            nodes = store.node_count(),
            edges = store.edge_count(),
            "server collected"
        );
        combined.merge(store, MergePolicy::PreferExisting);
        collected += 1;
    }

    if collected == 0 {
        return Err(CliError::Validation(
            "no server could be collected".to_string(),
        ));
    }

    if args.bloodhound.configured() {
        let edges = sync::run(&args.bloodhound, &mut combined).await?;
        info!(edges, "domain sync added edges");
    }

    log_kind_summary(&combined);
    info!(
        nodes = combined.node_count(),
        edges = combined.edge_count(),
        output = %args.output.display(),
        "writing graph document"
    );
    write_graph(&combined.into_document(), &args.output)?;
    Ok(())
}

fn log_kind_summary(store: &GraphStore) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for node in store.nodes() {
        if let Some(kind) = node.kinds.first() {
            *counts.entry(kind.as_str()).or_default() += 1;
        }
    }
    for (kind, count) in counts {
        debug!(kind, count, "node kind total");
    }
}
