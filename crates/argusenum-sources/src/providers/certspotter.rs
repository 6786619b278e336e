//! Cert Spotter issuance search.

use std::time::Duration;

use argusenum_core::{scoped_hosts, CancelSignal, ConfigError, SourceResult, SubdomainSource};
use async_trait::async_trait;
use serde::Deserialize;

use crate::http::{env_credential, fetch_json, Endpoint};

pub const NAME: &str = "certspotter";
pub const API_KEY_VAR: &str = "ARGUSENUM_CERTSPOTTER_API_KEY";
const BASE_URL: &str = "https://api.certspotter.com";
const TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Deserialize)]
struct Issuance {
    #[serde(default)]
    dns_names: Vec<String>,
}

/// Cert Spotter works anonymously at a low rate; a key raises the quota.
#[derive(Debug, Clone)]
pub struct CertSpotter {
    endpoint: Endpoint,
    api_key: Option<String>,
}

impl CertSpotter {
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
impl SubdomainSource for CertSpotter {
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
            .get(self.endpoint.url("/v1/issuances"))
            .query(&[
                ("domain", domain),
                ("include_subdomains", "true"),
                ("expand", "dns_names"),
            ]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let issuances: Vec<Issuance> = fetch_json(NAME, &self.endpoint, cancel, request).await?;
        Ok(scoped_hosts(
            domain,
            issuances.iter().flat_map(|i| i.dns_names.iter()),
        ))
    }
}
