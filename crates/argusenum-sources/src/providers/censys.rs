//! Censys host search over TLS leaf certificate names.

use std::time::Duration;

use argusenum_core::{scoped_hosts, CancelSignal, ConfigError, SourceResult, SubdomainSource};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::http::{env_credential, fetch_json, Endpoint};

pub const NAME: &str = "censys";
pub const API_ID_VAR: &str = "ARGUSENUM_CENSYS_API_ID";
pub const API_SECRET_VAR: &str = "ARGUSENUM_CENSYS_API_SECRET";
pub const API_KEY_VAR: &str = "ARGUSENUM_CENSYS_API_KEY";
const BASE_URL: &str = "https://search.censys.io";
const TIMEOUT: Duration = Duration::from_secs(20);
const PER_PAGE: u32 = 100;

/// Censys accepts either an API id/secret pair or a personal access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CensysAuth {
    Basic { id: String, secret: String },
    Token(String),
}

impl CensysAuth {
    /// id/secret pair if both are set, otherwise the token, otherwise none.
    pub fn from_env() -> Option<Self> {
        match (env_credential(API_ID_VAR), env_credential(API_SECRET_VAR)) {
            (Some(id), Some(secret)) => Some(CensysAuth::Basic { id, secret }),
            _ => env_credential(API_KEY_VAR).map(CensysAuth::Token),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: SearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Default, Deserialize)]
struct Hit {
    #[serde(default)]
    services: Vec<Service>,
}

#[derive(Debug, Default, Deserialize)]
struct Service {
    #[serde(default)]
    tls: Option<Tls>,
}

#[derive(Debug, Default, Deserialize)]
struct Tls {
    #[serde(default)]
    certificates: Certificates,
}

#[derive(Debug, Default, Deserialize)]
struct Certificates {
    #[serde(default)]
    leaf_data: LeafData,
}

#[derive(Debug, Default, Deserialize)]
struct LeafData {
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Censys {
    endpoint: Endpoint,
    auth: Option<CensysAuth>,
}

impl Censys {
    pub fn new(auth: Option<CensysAuth>) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: Endpoint::new(BASE_URL, TIMEOUT)?,
            auth,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(CensysAuth::from_env())
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
impl SubdomainSource for Censys {
    fn name(&self) -> &str {
        NAME
    }

    fn timeout(&self) -> Duration {
        self.endpoint.timeout()
    }

    async fn enumerate(&self, cancel: &CancelSignal, domain: &str) -> SourceResult {
        let Some(auth) = &self.auth else {
            debug!(source = NAME, "no credentials configured, skipping");
            return Ok(Vec::new());
        };

        let query = format!(
            "services.tls.certificates.leaf_data.names: {domain} or \
             services.tls.certificates.leaf_data.names: *.{domain}"
        );
        let request = self
            .endpoint
            .client()
            .post(self.endpoint.url("/api/v2/hosts/search"))
            .json(&json!({ "q": query, "per_page": PER_PAGE }));
        let request = match auth {
            CensysAuth::Basic { id, secret } => request.basic_auth(id, Some(secret)),
            CensysAuth::Token(token) => request.bearer_auth(token),
        };

        let response: SearchResponse = fetch_json(NAME, &self.endpoint, cancel, request).await?;
        let names = response
            .result
            .hits
            .iter()
            .flat_map(|hit| hit.services.iter())
            .filter_map(|service| service.tls.as_ref())
            .flat_map(|tls| tls.certificates.leaf_data.names.iter());
        Ok(scoped_hosts(domain, names))
    }
}
