//! Common Crawl URL index.
//!
//! Two steps: `collinfo.json` lists the crawl collections newest first, then
//! the CDX index of each of the newest few is queried for captured URLs
//! under the domain. Index responses are NDJSON, one capture per line.

use std::time::Duration;

use argusenum_core::{
    scoped_hosts, CancelSignal, ConfigError, SourceError, SourceResult, SubdomainSource,
};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::http::{ensure_success, fetch_json, send, transport_error, Endpoint};

pub const NAME: &str = "commoncrawl";
const BASE_URL: &str = "https://index.commoncrawl.org";
const TIMEOUT: Duration = Duration::from_secs(30);

/// How many of the newest collections are queried by default.
pub const DEFAULT_COLLECTIONS: usize = 3;

#[derive(Debug, Deserialize)]
struct Collection {
    id: String,
    #[serde(rename = "cdx-api")]
    cdx_api: String,
}

#[derive(Debug, Deserialize)]
struct Capture {
    #[serde(default)]
    url: String,
}

fn hostname(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}

#[derive(Debug, Clone)]
pub struct CommonCrawl {
    endpoint: Endpoint,
    collections: usize,
}

impl CommonCrawl {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: Endpoint::new(BASE_URL, TIMEOUT)?,
            collections: DEFAULT_COLLECTIONS,
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

    /// Query the newest `n` collections (at least one).
    pub fn with_collections(mut self, n: usize) -> Self {
        self.collections = n.max(1);
        self
    }

    async fn query_index(
        &self,
        cancel: &CancelSignal,
        collection: &Collection,
        domain: &str,
    ) -> Result<Vec<String>, SourceError> {
        let pattern = format!("*.{domain}");
        let request = self.endpoint.client().get(&collection.cdx_api).query(&[
            ("url", pattern.as_str()),
            ("matchType", "domain"),
            ("output", "json"),
        ]);
        let response = send(NAME, self.endpoint.timeout(), cancel, request).await?;
        // The index answers 404 when a collection has no captures.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body = ensure_success(NAME, response)
            .await?
            .text()
            .await
            .map_err(|e| transport_error(NAME, self.endpoint.timeout(), e))?;

        Ok(body
            .lines()
            .filter_map(|line| serde_json::from_str::<Capture>(line).ok())
            .filter_map(|capture| hostname(&capture.url))
            .collect())
    }
}

#[async_trait]
impl SubdomainSource for CommonCrawl {
    fn name(&self) -> &str {
        NAME
    }

    /// Collection listing plus one round of concurrent index queries.
    fn timeout(&self) -> Duration {
        self.endpoint.timeout() * 2
    }

    async fn enumerate(&self, cancel: &CancelSignal, domain: &str) -> SourceResult {
        let request = self.endpoint.client().get(self.endpoint.url("/collinfo.json"));
        let collections: Vec<Collection> = fetch_json(NAME, &self.endpoint, cancel, request).await?;
        if collections.is_empty() {
            return Err(SourceError::Decode {
                provider: NAME.to_string(),
                detail: "collection list is empty".to_string(),
            });
        }

        let newest = &collections[..self.collections.min(collections.len())];
        let queries = newest.iter().map(|collection| {
            let query = self.query_index(cancel, collection, domain);
            async move { (collection.id.as_str(), query.await) }
        });
        let results = join_all(queries).await;

        let mut hosts = Vec::new();
        let mut first_error = None;
        let mut answered = 0;
        for (id, result) in results {
            match result {
                Ok(found) => {
                    answered += 1;
                    hosts.extend(found);
                }
                Err(e) => {
                    debug!(source = NAME, collection = %id, error = %e, "index query failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if answered == 0 {
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        Ok(scoped_hosts(domain, hosts))
    }
}
