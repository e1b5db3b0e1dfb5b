//! Shared BloodHound connection arguments and domain sync execution.

use clap::Args;
use tracing::info;

use vhound_bloodhound::{BloodHoundClient, BloodHoundConfig, DomainSyncResolver};
use vhound_graph::GraphStore;

use crate::error::CliResult;

/// BloodHound instance connection arguments
#[derive(Args, Clone)]
pub struct BloodHoundArgs {
    /// BloodHound base URL, e.g. https://bloodhound.corp.local
    #[arg(long = "bloodhound-url", env = "BLOODHOUND_URL")]
    pub url: Option<String>,

    /// BloodHound API token id
    #[arg(long = "token-id", env = "BLOODHOUND_TOKEN_ID")]
    pub token_id: Option<String>,

    /// BloodHound API token secret
    #[arg(long = "token-secret", env = "BLOODHOUND_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Skip TLS certificate verification for the BloodHound API
    #[arg(long = "bloodhound-insecure")]
    pub insecure: bool,
}

impl BloodHoundArgs {
    /// Whether enough arguments were supplied to attempt a sync.
    pub fn configured(&self) -> bool {
        self.url.is_some()
    }

    pub fn config(&self) -> Option<BloodHoundConfig> {
        Some(BloodHoundConfig {
            base_url: self.url.clone()?,
            token_id: self.token_id.clone().unwrap_or_default(),
            token_secret: self.token_secret.clone().unwrap_or_default(),
            insecure: self.insecure,
        })
    }
}

/// Fetch the domain table and add sync edges to `store`.
pub async fn run(args: &BloodHoundArgs, store: &mut GraphStore) -> CliResult<usize> {
    let Some(config) = args.config() else {
        return Ok(0);
    };
    let client = BloodHoundClient::new(&config)?;
    let domains = client.domain_map().await?;
    info!(domains = domains.len(), "retrieved bloodhound domain table");

    let resolver = DomainSyncResolver::new(domains);
    Ok(resolver.resolve(store))
}
