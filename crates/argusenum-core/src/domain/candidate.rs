//! Discovered hostnames and their enrichment fields.

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::Serialize;

use crate::domain::normalize::{is_subdomain_of, normalize};

/// A discovered hostname flowing through the enrichment stages.
///
/// `name` and `domain` are fixed at construction: `name` is normalized and
/// always in scope of `domain`. Stages may only add information through the
/// public enrichment fields.
///
/// The serialized form is the on-disk export record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    name: String,
    domain: String,
    source: String,
    /// Resolved addresses in lookup order; empty until resolution runs.
    pub ips: Vec<IpAddr>,
    /// `true` once a liveness probe received any HTTP response.
    pub alive: bool,
    /// Status code of the liveness probe, absent if never answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Technology fingerprints.
    pub tech: BTreeSet<String>,
    /// Contextual tags (`env:dev`, `unresolved`, ...).
    pub tags: BTreeSet<String>,
}

impl Candidate {
    /// Build a candidate, or `None` when `raw_name` normalizes to something
    /// outside `domain`.
    pub fn new(raw_name: &str, domain: &str, source: &str) -> Option<Self> {
        let name = normalize(raw_name);
        let domain = normalize(domain);
        if !is_subdomain_of(&name, &domain) {
            return None;
        }
        Some(Self {
            name,
            domain,
            source: source.to_string(),
            ips: Vec::new(),
            alive: false,
            http_status: None,
            tech: BTreeSet::new(),
            tags: BTreeSet::new(),
        })
    }

    /// Normalized fully-qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root domain this candidate was discovered for.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Identifier of the adapter that first reported this name.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the name has at least one resolved address.
    pub fn is_resolved(&self) -> bool {
        !self.ips.is_empty()
    }

    /// Hostname labels left of the root domain, outermost first.
    ///
    /// `a.b.example.com` under `example.com` yields `["a", "b"]`.
    pub fn sub_labels(&self) -> Vec<&str> {
        match self.name.strip_suffix(&self.domain) {
            Some(prefix) => prefix
                .trim_end_matches('.')
                .split('.')
                .filter(|l| !l.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }
}
