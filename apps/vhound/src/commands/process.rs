//! Process command - re-run domain sync over an existing document.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use vhound_graph::{read_graph, write_graph, GraphStore};

use crate::commands::sync::{self, BloodHoundArgs};
use crate::error::{CliError, CliResult};

/// Arguments for the process command
#[derive(Args)]
pub struct ProcessArgs {
    /// Graph document to read
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// Output file path; defaults to rewriting the input
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub bloodhound: BloodHoundArgs,
}

/// Execute the process command
pub async fn execute(args: ProcessArgs) -> CliResult<()> {
    if !args.bloodhound.configured() {
        return Err(CliError::Validation(
            "process requires --bloodhound-url".to_string(),
        ));
    }

    let doc = read_graph(&args.input)?;
    let mut store = GraphStore::from_document(doc);
    info!(
        input = %args.input.display(),
        nodes = store.node_count(),
        edges = store.edge_count(),
        "loaded graph document"
    );

    let edges = sync::run(&args.bloodhound, &mut store).await?;
    info!(edges, "domain sync added edges");

    let output = args.output.as_ref().unwrap_or(&args.input);
    write_graph(&store.into_document(), output)?;
    info!(output = %output.display(), "wrote graph document");
    Ok(())
}
