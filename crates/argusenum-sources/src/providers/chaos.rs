//! ProjectDiscovery Chaos dataset. Returns labels, not full names.

use std::time::Duration;

use argusenum_core::{
    join_label, scoped_hosts, CancelSignal, ConfigError, SourceResult, SubdomainSource,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::http::{env_credential, fetch_json, Endpoint};

pub const NAME: &str = "chaos";
pub const API_KEY_VAR: &str = "ARGUSENUM_CHAOS_API_KEY";
const BASE_URL: &str = "https://dns.projectdiscovery.io";
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct Dataset {
    #[serde(default)]
    subdomains: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Chaos {
    endpoint: Endpoint,
    api_key: Option<String>,
}

impl Chaos {
    pub fn new(api_key: Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: Endpoint::new(BASE_URL, TIMEOUT)?,
            api_key,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(env_credential(API_KEY_VAR))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.endpoint.set_base_url(base_url);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.endpoint.set_timeout(timeout);
        self
    }
}

#[async_trait]
impl SubdomainSource for Chaos {
    fn name(&self) -> &str {
        NAME
    }

    fn timeout(&self) -> Duration {
        self.endpoint.timeout()
    }

    async fn enumerate(&self, cancel: &CancelSignal, domain: &str) -> SourceResult {
        let Some(key) = &self.api_key else {
            debug!(source = NAME, "no API key configured, skipping");
            return Ok(Vec::new());
        };

        let request = self
            .endpoint
            .client()
            .get(self.endpoint.url(&format!("/dns/{domain}/subdomains")))
            .header("Authorization", key);
        let dataset: Dataset = fetch_json(NAME, &self.endpoint, cancel, request).await?;
        Ok(scoped_hosts(
            domain,
            dataset.subdomains.iter().map(|label| join_label(label, domain)),
        ))
    }
}
