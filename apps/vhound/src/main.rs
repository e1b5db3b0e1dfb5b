//! vhound - vCenter to BloodHound graph collector
//!
//! Collects vSphere inventory, permissions and group memberships into a
//! BloodHound OpenGraph document, and joins collected principals to Active
//! Directory objects known to a BloodHound instance.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use error::CliResult;

/// vCenter attack-path collector
#[derive(Parser)]
#[command(name = "vhound")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect one or more vCenter servers into a graph document
    Collect(commands::collect::CollectArgs),

    /// Re-run domain sync over an existing graph document
    Process(commands::process::ProcessArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Collect(args) => commands::collect::execute(args).await,
        Commands::Process(args) => commands::process::execute(args).await,
    }
}
