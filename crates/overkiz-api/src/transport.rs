// Shared transport configuration for building reqwest::Client instances.
//
// The Overkiz API uses cookie-session auth, so every client carries a
// cookie store. TLS is always the system store -- the cloud endpoints
// present valid certificates.

use std::time::Duration;

/// Transport configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("kizbridge/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
