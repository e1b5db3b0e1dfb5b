//! BloodHound REST API client (reqwest-based).

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{BloodHoundError, BloodHoundResult};
use crate::signer::RequestSigner;

/// Connection settings for one BloodHound instance.
#[derive(Debug, Clone)]
pub struct BloodHoundConfig {
    /// Base URL of the instance, e.g. `https://bloodhound.corp.local`.
    pub base_url: String,
    /// API token id.
    pub token_id: String,
    /// API token secret.
    pub token_secret: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
}

impl BloodHoundConfig {
    fn validate(&self) -> BloodHoundResult<Url> {
        if self.token_id.is_empty() || self.token_secret.is_empty() {
            return Err(BloodHoundError::invalid_configuration(
                "token id and token secret are required",
            ));
        }
        Url::parse(self.base_url.trim_end_matches('/')).map_err(|err| {
            BloodHoundError::invalid_configuration(format!(
                "invalid base url '{}': {err}",
                self.base_url
            ))
        })
    }
}

/// One domain known to the BloodHound instance.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailableDomain {
    pub name: String,
    #[serde(rename = "type", default)]
    pub domain_type: String,
    #[serde(default)]
    pub collected: bool,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Client for the BloodHound API, signing every request.
#[derive(Debug, Clone)]
pub struct BloodHoundClient {
    http: Client,
    base: Url,
    signer: RequestSigner,
}

impl BloodHoundClient {
    pub fn new(config: &BloodHoundConfig) -> BloodHoundResult<Self> {
        let base = config.validate()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(config.insecure)
            .build()?;
        Ok(Self {
            http,
            base,
            signer: RequestSigner::new(&config.token_id, &config.token_secret),
        })
    }

    /// List the Active Directory domains the instance knows about.
    pub async fn available_domains(&self) -> BloodHoundResult<Vec<AvailableDomain>> {
        let envelope: DataEnvelope<Vec<AvailableDomain>> =
            self.get("/api/v2/available-domains").await?;
        Ok(envelope.data)
    }

    /// The join table used by domain sync: uppercased NetBIOS-style short
    /// name (first DNS label) to uppercased FQDN. Only the first label is
    /// keyed; a principal whose domain fragment is already fully qualified
    /// does not match.
    pub async fn domain_map(&self) -> BloodHoundResult<BTreeMap<String, String>> {
        let mut map = BTreeMap::new();
        for domain in self.available_domains().await? {
            if !domain.domain_type.is_empty() && domain.domain_type != "active-directory" {
                debug!(name = %domain.name, kind = %domain.domain_type, "skipping non-AD domain");
                continue;
            }
            let fqdn = domain.name.to_uppercase();
            if let Some(short) = fqdn.split('.').next() {
                map.insert(short.to_string(), fqdn);
            }
        }
        Ok(map)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> BloodHoundResult<T> {
        let url = self
            .base
            .join(path)
            .map_err(|err| BloodHoundError::invalid_configuration(err.to_string()))?;
        let headers = self.signer.sign("GET", path, b"")?;

        debug!(%url, "bloodhound api request");
        let response = self
            .http
            .get(url)
            .header("Authorization", &headers.authorization)
            .header("RequestDate", &headers.request_date)
            .header("Signature", &headers.signature)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "bloodhound api error");
            return Err(BloodHoundError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}
