//! Correlation stage: derive tags from names and earlier stage results.
//!
//! Enrichers are pure and synchronous. With no enrichers registered the
//! stage is the identity transform.

use std::net::IpAddr;
use std::time::Instant;

use async_trait::async_trait;

use crate::domain::Candidate;
use crate::obs;
use crate::stage::{BuiltinStage, Stage, StageOutput};

/// A tagging rule applied to one candidate at a time.
pub trait Enricher: Send + Sync {
    fn name(&self) -> &str;

    /// Add tags (or tech hints) to `candidate`. Must not remove anything.
    fn enrich(&self, candidate: &mut Candidate);
}

const ENVIRONMENTS: &[(&str, &[&str])] = &[
    ("env:dev", &["dev", "devel", "develop", "development"]),
    ("env:staging", &["staging", "stage", "stg", "preprod"]),
    ("env:test", &["test", "testing", "qa", "uat", "sandbox"]),
    ("env:prod", &["prod", "production", "live"]),
];

const ROLES: &[(&str, &[&str])] = &[
    ("role:api", &["api", "gateway", "graphql"]),
    ("role:admin", &["admin", "administrator", "panel", "dashboard", "console"]),
    ("role:mail", &["mail", "webmail", "smtp", "imap", "pop", "pop3", "mx"]),
    ("role:vpn", &["vpn", "sslvpn", "remote"]),
    ("role:internal", &["internal", "intranet", "corp"]),
    ("role:cdn", &["cdn", "static", "assets", "media"]),
];

/// Tags environment and role hints found in the labels left of the root.
///
/// Labels are split on `-`, and a trailing run of digits is ignored, so
/// `dev2-api.example.com` yields both `env:dev` and `role:api`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvironmentTagger;

impl EnvironmentTagger {
    fn tokens(candidate: &Candidate) -> Vec<&str> {
        candidate
            .sub_labels()
            .into_iter()
            .flat_map(|label| label.split('-'))
            .map(|token| token.trim_end_matches(|c: char| c.is_ascii_digit()))
            .filter(|token| !token.is_empty())
            .collect()
    }
}

impl Enricher for EnvironmentTagger {
    fn name(&self) -> &str {
        "environment"
    }

    fn enrich(&self, candidate: &mut Candidate) {
        let tokens = Self::tokens(candidate);
        let mut found = Vec::new();
        for (tag, words) in ENVIRONMENTS.iter().chain(ROLES) {
            if tokens.iter().any(|t| words.contains(t)) {
                found.push(*tag);
            }
        }
        for tag in found {
            candidate.tags.insert(tag.to_string());
        }
    }
}

/// Tags exposure facts: resolution, address class, reachability, status.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExposureTagger;

fn is_non_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

impl Enricher for ExposureTagger {
    fn name(&self) -> &str {
        "exposure"
    }

    fn enrich(&self, candidate: &mut Candidate) {
        if candidate.ips.is_empty() {
            candidate.tags.insert("unresolved".to_string());
        } else if candidate.ips.iter().any(is_non_public) {
            candidate.tags.insert("private-address".to_string());
        }
        if candidate.alive {
            candidate.tags.insert("alive".to_string());
        }
        if let Some(status) = candidate.http_status {
            candidate.tags.insert(format!("http-{}xx", status / 100));
        }
    }
}

/// Runs every registered enricher over every candidate, in registration order.
pub struct CorrelationStage {
    enrichers: Vec<Box<dyn Enricher>>,
}

impl CorrelationStage {
    pub fn new(enrichers: Vec<Box<dyn Enricher>>) -> Self {
        Self { enrichers }
    }

    /// Stage that changes nothing.
    pub fn identity() -> Self {
        Self::new(Vec::new())
    }

    /// Environment and exposure tagging.
    pub fn builtin() -> Self {
        Self::new(vec![Box::new(EnvironmentTagger), Box::new(ExposureTagger)])
    }

    pub fn enricher_names(&self) -> Vec<&str> {
        self.enrichers.iter().map(|e| e.name()).collect()
    }
}

#[async_trait]
impl Stage for CorrelationStage {
    fn name(&self) -> &str {
        BuiltinStage::Correlation.name()
    }

    async fn run(&self, mut candidates: Vec<Candidate>) -> StageOutput {
        let started = Instant::now();
        for candidate in candidates.iter_mut() {
            for enricher in &self.enrichers {
                enricher.enrich(candidate);
            }
        }
        obs::emit_stage_finished(
            self.name(),
            candidates.len(),
            0,
            started.elapsed().as_millis() as u64,
        );
        StageOutput::unchanged(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> Candidate {
        Candidate::new(name, "example.com", "test").unwrap()
    }

    fn tags(c: &Candidate) -> Vec<&str> {
        c.tags.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_environment_tags_from_labels() {
        let mut c = candidate("dev2-api.eu.example.com");
        EnvironmentTagger.enrich(&mut c);
        assert_eq!(tags(&c), vec!["env:dev", "role:api"]);
    }

    #[test]
    fn test_environment_ignores_root_labels() {
        // "mail" is part of the root, not a sub-label.
        let mut c = Candidate::new("www.mail.example", "mail.example", "test").unwrap();
        EnvironmentTagger.enrich(&mut c);
        assert!(c.tags.is_empty());
    }

    #[test]
    fn test_environment_does_not_match_substrings() {
        let mut c = candidate("developers.example.com");
        EnvironmentTagger.enrich(&mut c);
        assert!(c.tags.is_empty());
    }

    #[test]
    fn test_exposure_unresolved() {
        let mut c = candidate("gone.example.com");
        ExposureTagger.enrich(&mut c);
        assert_eq!(tags(&c), vec!["unresolved"]);
    }

    #[test]
    fn test_exposure_private_and_status() {
        let mut c = candidate("intranet.example.com");
        c.ips.push("10.0.0.5".parse().unwrap());
        c.alive = true;
        c.http_status = Some(302);
        ExposureTagger.enrich(&mut c);
        assert_eq!(tags(&c), vec!["alive", "http-3xx", "private-address"]);
    }

    #[test]
    fn test_exposure_ipv6_unique_local() {
        let mut c = candidate("v6.example.com");
        c.ips.push("fd00::1".parse().unwrap());
        ExposureTagger.enrich(&mut c);
        assert!(c.tags.contains("private-address"));

        let mut public = candidate("pub.example.com");
        public.ips.push("2001:db8::1".parse().unwrap());
        ExposureTagger.enrich(&mut public);
        assert!(public.tags.is_empty());
    }

    #[tokio::test]
    async fn test_identity_stage_changes_nothing() {
        let stage = CorrelationStage::identity();
        let out = stage.run(vec![candidate("admin.example.com")]).await;
        assert_eq!(out.candidates.len(), 1);
        assert!(out.candidates[0].tags.is_empty());
    }

    #[tokio::test]
    async fn test_builtin_stage_tags_everything() {
        let stage = CorrelationStage::builtin();
        assert_eq!(stage.enricher_names(), vec!["environment", "exposure"]);

        let mut live = candidate("admin.example.com");
        live.ips.push("203.0.113.9".parse().unwrap());
        live.alive = true;
        live.http_status = Some(401);

        let out = stage.run(vec![live, candidate("old.example.com")]).await;
        assert_eq!(tags(&out.candidates[0]), vec!["alive", "http-4xx", "role:admin"]);
        assert_eq!(tags(&out.candidates[1]), vec!["unresolved"]);
    }
}
