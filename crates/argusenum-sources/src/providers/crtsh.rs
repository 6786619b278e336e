//! crt.sh certificate transparency search.

use std::time::Duration;

use argusenum_core::{scoped_hosts, CancelSignal, ConfigError, SourceResult, SubdomainSource};
use async_trait::async_trait;
use serde::Deserialize;

use crate::http::{fetch_json, Endpoint};

pub const NAME: &str = "crt.sh";
const BASE_URL: &str = "https://crt.sh";
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    name_value: String,
}

/// Certificate transparency logs via crt.sh. No credential needed.
#[derive(Debug, Clone)]
pub struct CrtSh {
    endpoint: Endpoint,
}

impl CrtSh {
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
impl SubdomainSource for CrtSh {
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
            .get(self.endpoint.url("/"))
            .query(&[("q", format!("%.{domain}").as_str()), ("output", "json")]);
        let entries: Vec<Entry> = fetch_json(NAME, &self.endpoint, cancel, request).await?;

        // name_value packs several SAN entries separated by newlines.
        let names = entries
            .iter()
            .flat_map(|e| e.name_value.split('\n'))
            .collect::<Vec<_>>();
        Ok(scoped_hosts(domain, names))
    }
}
