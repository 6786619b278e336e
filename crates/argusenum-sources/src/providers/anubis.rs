//! AnubisDB subdomain search.

use std::time::Duration;

use argusenum_core::{scoped_hosts, CancelSignal, ConfigError, SourceResult, SubdomainSource};
use async_trait::async_trait;

use crate::http::{fetch_json, Endpoint};

pub const NAME: &str = "anubisdb";
const BASE_URL: &str = "https://anubisdb.com";
const TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct AnubisDb {
    endpoint: Endpoint,
}

impl AnubisDb {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: Endpoint::new(BASE_URL, TIMEOUT)?,
        })
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
impl SubdomainSource for AnubisDb {
    fn name(&self) -> &str {
        NAME
    }

    fn timeout(&self) -> Duration {
        self.endpoint.timeout()
    }

    async fn enumerate(&self, cancel: &CancelSignal, domain: &str) -> SourceResult {
        let request = self
            .endpoint
            .client()
            .get(self.endpoint.url(&format!("/anubis/subdomains/{domain}")));
        let names: Vec<String> = fetch_json(NAME, &self.endpoint, cancel, request).await?;
        Ok(scoped_hosts(domain, names))
    }
}
