//! DNSDumpster host records.

use std::time::Duration;

use argusenum_core::{scoped_hosts, CancelSignal, ConfigError, SourceResult, SubdomainSource};
use async_trait::async_trait;
use serde::Deserialize;

use crate::http::{env_credential, fetch_json, Endpoint};

pub const NAME: &str = "dnsdumpster";
pub const API_KEY_VAR: &str = "ARGUSENUM_DNSDUMPSTER_API_KEY";
const BASE_URL: &str = "https://api.dnsdumpster.com";
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
struct Report {
    #[serde(default)]
    dns_records: DnsRecords,
}

#[derive(Debug, Default, Deserialize)]
struct DnsRecords {
    #[serde(default)]
    host: Vec<HostRecord>,
}

#[derive(Debug, Deserialize)]
struct HostRecord {
    #[serde(default)]
    domain: String,
}

/// The key is optional; without it the request goes out unauthenticated.
#[derive(Debug, Clone)]
pub struct DnsDumpster {
    endpoint: Endpoint,
    api_key: Option<String>,
}

impl DnsDumpster {
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
impl SubdomainSource for DnsDumpster {
    fn name(&self) -> &str {
        NAME
    }

    fn timeout(&self) -> Duration {
        self.endpoint.timeout()
    }

    async fn enumerate(&self, cancel: &CancelSignal, domain: &str) -> SourceResult {
        let mut request = self
            .endpoint
            .client()
            .get(self.endpoint.url(&format!("/domain/{domain}")))
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let report: Report = fetch_json(NAME, &self.endpoint, cancel, request).await?;
        Ok(scoped_hosts(
            domain,
            report.dns_records.host.iter().map(|h| &h.domain),
        ))
    }
}
