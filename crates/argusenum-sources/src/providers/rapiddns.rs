//! RapidDNS. The only HTML-scraping adapter: hostnames are read out of
//! `<td>` cells of the result table.

use std::time::Duration;

use argusenum_core::{scoped_hosts, CancelSignal, ConfigError, SourceResult, SubdomainSource};
use async_trait::async_trait;

use crate::http::{fetch_text, Endpoint};

pub const NAME: &str = "rapiddns";
const BASE_URL: &str = "https://rapiddns.io";
const TIMEOUT: Duration = Duration::from_secs(20);

/// Text of every `<td>...</td>` cell, in document order.
fn table_cells(html: &str) -> impl Iterator<Item = &str> {
    html.split("<td>")
        .skip(1)
        .filter_map(|rest| rest.split_once("</td>").map(|(cell, _)| cell))
}

#[derive(Debug, Clone)]
pub struct RapidDns {
    endpoint: Endpoint,
}

impl RapidDns {
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
impl SubdomainSource for RapidDns {
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
            .get(self.endpoint.url(&format!("/subdomain/{domain}")))
            .query(&[("full", "1")]);
        let html = fetch_text(NAME, &self.endpoint, cancel, request).await?;
        Ok(scoped_hosts(domain, table_cells(&html)))
    }
}
