//! vCenter connection settings.

use vhound_collector::{CollectorError, CollectorResult};

/// Connection settings for one vCenter server.
#[derive(Debug, Clone)]
pub struct VimConfig {
    /// Hostname, also the middle component of every entity id this source
    /// produces.
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl VimConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 443,
            username: username.into(),
            password: password.into(),
            insecure: false,
            timeout_secs: 60,
        }
    }

    pub(crate) fn validate(&self) -> CollectorResult<()> {
        if self.host.is_empty() {
            return Err(CollectorError::InvalidConfiguration {
                message: "vcenter host is required".to_string(),
            });
        }
        if self.username.is_empty() || self.password.is_empty() {
            return Err(CollectorError::InvalidConfiguration {
                message: format!("credentials for {} are required", self.host),
            });
        }
        Ok(())
    }

    /// The SOAP endpoint URL.
    pub(crate) fn sdk_url(&self) -> String {
        format!("https://{}:{}/sdk", self.host, self.port)
    }
}
