//! Handle on the service under test

use reqwest::Client;

use crate::checks::CheckPolicy;
use crate::config::RunConfig;

/// Header carrying the session token on authenticated calls
pub const TOKEN_HEADER: &str = "X-Token";

/// Shared HTTP client, base URL and check thresholds.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct Target {
    client: Client,
    base_url: String,
    policy: CheckPolicy,
}

impl Target {
    pub fn new(client: Client, base_url: impl Into<String>, policy: CheckPolicy) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            policy,
        }
    }

    /// Build the HTTP client from the run configuration
    pub fn from_config(config: &RunConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.vus.max(1))
            .timeout(config.http.request_timeout)
            .build()?;
        Ok(Self::new(
            client,
            config.base_url.clone(),
            CheckPolicy::from(&config.http),
        ))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn policy(&self) -> &CheckPolicy {
        &self.policy
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
