//! VirusTotal v3 domain relationships.

use std::time::Duration;

use argusenum_core::{scoped_hosts, CancelSignal, ConfigError, SourceResult, SubdomainSource};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::http::{env_credential, fetch_json, Endpoint};

pub const NAME: &str = "virustotal";
pub const API_KEY_VAR: &str = "ARGUSENUM_VIRUSTOTAL_API_KEY";
const BASE_URL: &str = "https://www.virustotal.com";
const TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Deserialize)]
struct Relationships {
    #[serde(default)]
    data: Vec<Object>,
}

#[derive(Debug, Deserialize)]
struct Object {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Clone)]
pub struct VirusTotal {
    endpoint: Endpoint,
    api_key: Option<String>,
}

impl VirusTotal {
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
impl SubdomainSource for VirusTotal {
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
            .get(self.endpoint.url(&format!("/api/v3/domains/{domain}/subdomains")))
            .header("x-apikey", key)
            .header("Accept", "application/json");
        let body: Relationships = fetch_json(NAME, &self.endpoint, cancel, request).await?;
        Ok(scoped_hosts(domain, body.data.iter().map(|o| &o.id)))
    }
}
