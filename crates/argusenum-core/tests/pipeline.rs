//! End-to-end engine runs with stub sources, resolver and prober.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use argusenum_core::{
    cancellation, Aggregator, CancelSignal, Candidate, ConfigError, CorrelationStage, Engine,
    ExportError, Exporter, HostResolver, JsonFileExporter, LookupError, Pipeline, ProbeError,
    Prober, RunConfig, SourceResult, SubdomainSource,
};
use async_trait::async_trait;
use serde_json::Value;

struct ListSource {
    name: &'static str,
    by_domain: HashMap<&'static str, Vec<&'static str>>,
}

#[async_trait]
impl SubdomainSource for ListSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn enumerate(&self, _cancel: &CancelSignal, domain: &str) -> SourceResult {
        Ok(self
            .by_domain
            .get(domain)
            .map(|hosts| hosts.iter().map(|h| h.to_string()).collect())
            .unwrap_or_default())
    }
}

struct FixedResolver(HashMap<&'static str, &'static str>);

#[async_trait]
impl HostResolver for FixedResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, LookupError> {
        match self.0.get(host) {
            Some(ip) => Ok(vec![ip.parse().unwrap()]),
            None => Err(LookupError::Failed {
                host: host.to_string(),
                detail: "NXDOMAIN".to_string(),
            }),
        }
    }
}

struct FixedProber(HashMap<&'static str, u16>);

#[async_trait]
impl Prober for FixedProber {
    async fn probe(&self, host: &str) -> Result<u16, ProbeError> {
        self.0.get(host).copied().ok_or_else(|| ProbeError::Timeout {
            url: format!("https://{host}/"),
        })
    }
}

/// Exporter that keeps what it was handed.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<Candidate>>>);

impl Exporter for Capture {
    fn target(&self) -> String {
        "memory".to_string()
    }

    fn export(&self, candidates: Vec<Candidate>) -> Result<usize, ExportError> {
        let n = candidates.len();
        *self.0.lock().unwrap() = candidates;
        Ok(n)
    }
}

fn sources() -> Vec<Arc<dyn SubdomainSource>> {
    vec![
        Arc::new(ListSource {
            name: "alpha",
            by_domain: HashMap::from([
                ("example.com", vec!["www.example.com", "dev-api.example.com"]),
                ("example.org", vec!["mail.example.org"]),
            ]),
        }),
        Arc::new(ListSource {
            name: "beta",
            by_domain: HashMap::from([
                ("example.com", vec!["WWW.example.com.", "old.example.com"]),
                ("dev.example.com", vec!["x.dev.example.com"]),
            ]),
        }),
    ]
}

fn pipeline() -> Pipeline {
    let resolver = Arc::new(FixedResolver(HashMap::from([
        ("www.example.com", "203.0.113.10"),
        ("dev-api.example.com", "10.1.2.3"),
        ("mail.example.org", "198.51.100.25"),
    ])));
    let prober = Arc::new(FixedProber(HashMap::from([
        ("www.example.com", 200),
        ("mail.example.org", 503),
    ])));
    Pipeline::standard(resolver, prober, CorrelationStage::builtin(), 4)
}

#[tokio::test]
async fn test_engine_enriches_and_exports_sorted_json() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results.json");

    let config = RunConfig::for_domains(["example.org", "example.com"]);
    let engine = Engine::new(config, Aggregator::new(sources()), pipeline())
        .with_exporter(JsonFileExporter::new(&out));

    let report = engine.run(&CancelSignal::never()).await.unwrap();
    assert_eq!(report.total, 4);
    assert_eq!(report.resolved, 3);
    assert_eq!(report.alive, 2);
    assert_eq!(report.exported_to.as_deref(), Some(out.to_str().unwrap()));
    assert_eq!(report.stages.len(), 3);
    assert!(report.stages.iter().all(|s| !s.discarded));
    assert!(!report.was_cancelled());

    let records: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let order: Vec<(&str, &str)> = records
        .iter()
        .map(|r| (r["domain"].as_str().unwrap(), r["name"].as_str().unwrap()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("example.com", "dev-api.example.com"),
            ("example.com", "old.example.com"),
            ("example.com", "www.example.com"),
            ("example.org", "mail.example.org"),
        ]
    );

    let dev_api = &records[0];
    assert_eq!(dev_api["ips"][0], "10.1.2.3");
    assert_eq!(dev_api["alive"], false);
    assert!(dev_api.get("http_status").is_none());
    let tags: Vec<&str> = dev_api["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap())
        .collect();
    assert_eq!(tags, vec!["env:dev", "private-address", "role:api"]);

    let mail = &records[3];
    assert_eq!(mail["http_status"], 503);
    assert!(mail["tags"]
        .as_array()
        .unwrap()
        .contains(&Value::from("http-5xx")));
}

#[tokio::test]
async fn test_first_domain_wins_across_overlapping_roots() {
    let capture = Capture::default();
    let config = RunConfig::for_domains(["dev.example.com", "example.com"]);
    let overlapping: Vec<Arc<dyn SubdomainSource>> = vec![Arc::new(ListSource {
        name: "gamma",
        by_domain: HashMap::from([
            ("dev.example.com", vec!["x.dev.example.com"]),
            ("example.com", vec!["x.dev.example.com", "www.example.com"]),
        ]),
    })];

    let engine = Engine::new(config, Aggregator::new(overlapping), Pipeline::new())
        .with_exporter(capture.clone());
    let report = engine.run(&CancelSignal::never()).await.unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.domains.len(), 2);

    let exported = capture.0.lock().unwrap();
    let x = exported
        .iter()
        .find(|c| c.name() == "x.dev.example.com")
        .unwrap();
    assert_eq!(x.domain(), "dev.example.com");
}

#[tokio::test]
async fn test_cancelled_run_still_exports() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("partial.json");
    let (canceller, signal) = cancellation();
    canceller.cancel();

    let engine = Engine::new(
        RunConfig::for_domains(["example.com"]),
        Aggregator::new(sources()),
        pipeline(),
    )
    .with_exporter(JsonFileExporter::new(&out));

    let report = engine.run(&signal).await.unwrap();
    assert!(report.was_cancelled());
    assert!(out.exists());
}

#[tokio::test]
async fn test_active_only_skips_sources_and_exports_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("active.json");

    let mut config = RunConfig::for_domains(["example.com"]);
    config.active_only = true;
    let engine = Engine::new(config, Aggregator::new(sources()), pipeline())
        .with_exporter(JsonFileExporter::new(&out));

    let report = engine.run(&CancelSignal::never()).await.unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "[]");
}

#[tokio::test]
async fn test_missing_exporter_skips_export() {
    let engine = Engine::new(
        RunConfig::for_domains(["example.org"]),
        Aggregator::new(sources()),
        Pipeline::new(),
    );
    let report = engine.run(&CancelSignal::never()).await.unwrap();
    assert_eq!(report.total, 1);
    assert!(report.exported_to.is_none());
}

#[tokio::test]
async fn test_export_failure_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(
        RunConfig::for_domains(["example.org"]),
        Aggregator::new(sources()),
        Pipeline::new(),
    )
    .with_exporter(JsonFileExporter::new(dir.path().join("missing/dir/out.json")));

    let err = engine.run(&CancelSignal::never()).await.unwrap_err();
    assert!(err.to_string().contains("export failed"));
}

#[tokio::test]
async fn test_build_rejects_invalid_config_before_any_work() {
    let err = Engine::build(RunConfig::default(), sources())
        .err()
        .expect("empty domain list rejected");
    assert!(matches!(err, ConfigError::NoDomains));

    let mut config = RunConfig::for_domains(["example.com"]);
    config.threads = 0;
    assert!(matches!(
        Engine::build(config, sources()).err(),
        Some(ConfigError::InvalidThreads)
    ));
}

#[tokio::test]
async fn test_build_with_custom_resolvers_and_no_output() {
    let mut config = RunConfig::for_domains(["example.com"]);
    config.resolvers = vec!["127.0.0.1:53".parse().unwrap()];
    config.output = None;
    config.aggregation_timeout = Some(Duration::from_secs(1));
    config.correlate = false;

    let engine = Engine::build(config, sources()).unwrap();
    assert_eq!(engine.config().domains, vec!["example.com"]);
}
