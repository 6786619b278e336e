//! Pipeline orchestration: aggregation per domain, enrichment stages, export.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::aggregator::Aggregator;
use crate::cancel::CancelSignal;
use crate::config::RunConfig;
use crate::domain::{Candidate, ConfigError, Result};
use crate::export::{Exporter, JsonFileExporter};
use crate::metrics::METRICS;
use crate::obs;
use crate::source::SubdomainSource;
use crate::stage::{
    CorrelationStage, DnsResolver, HostResolver, HttpsProber, LivenessStage, Prober,
    ResolutionStage, Stage, StageWarning, DEFAULT_PROBE_TIMEOUT,
};

/// Outcome of one stage within a run.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: String,
    pub warnings: Vec<StageWarning>,
    pub duration_ms: u64,
    /// The stage changed set membership and its output was thrown away.
    pub discarded: bool,
}

/// Per-domain aggregation summary.
#[derive(Debug, Clone)]
pub struct DomainReport {
    pub domain: String,
    /// Candidates the aggregator returned for this domain.
    pub candidates: usize,
    pub failed_sources: usize,
    /// Diagnostic aggregation error, if any.
    pub error: Option<String>,
    pub cancelled: bool,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub domains: Vec<DomainReport>,
    pub stages: Vec<StageReport>,
    /// Unique candidates after cross-domain deduplication.
    pub total: usize,
    pub resolved: usize,
    pub alive: usize,
    /// Export destination, when an export happened.
    pub exported_to: Option<String>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn warning_count(&self) -> usize {
        self.stages.iter().map(|s| s.warnings.len()).sum()
    }

    pub fn was_cancelled(&self) -> bool {
        self.domains.iter().any(|d| d.cancelled)
    }
}

/// Ordered enrichment stages.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolution, then liveness, then correlation.
    pub fn standard(
        resolver: Arc<dyn HostResolver>,
        prober: Arc<dyn Prober>,
        correlation: CorrelationStage,
        width: usize,
    ) -> Self {
        Self::new()
            .with_stage(ResolutionStage::new(resolver, width))
            .with_stage(LivenessStage::new(prober, width))
            .with_stage(correlation)
    }

    /// Append a stage; stages run in insertion order.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order. A stage that changes the set of names is
    /// reported and its output replaced by its input.
    pub async fn run(&self, mut candidates: Vec<Candidate>) -> (Vec<Candidate>, Vec<StageReport>) {
        let mut reports = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let started = Instant::now();
            let snapshot = candidates.clone();
            let output = stage.run(candidates).await;

            let discarded = !same_members(&snapshot, &output.candidates);
            candidates = if discarded {
                warn!(
                    stage = %stage.name(),
                    before = snapshot.len(),
                    after = output.candidates.len(),
                    "stage changed candidate membership; discarding its output"
                );
                snapshot
            } else {
                output.candidates
            };

            reports.push(StageReport {
                stage: stage.name().to_string(),
                warnings: output.warnings,
                duration_ms: started.elapsed().as_millis() as u64,
                discarded,
            });
        }
        (candidates, reports)
    }
}

fn same_members(before: &[Candidate], after: &[Candidate]) -> bool {
    if before.len() != after.len() {
        return false;
    }
    let mut a: Vec<&str> = before.iter().map(Candidate::name).collect();
    let mut b: Vec<&str> = after.iter().map(Candidate::name).collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// Drives one complete run.
pub struct Engine {
    config: RunConfig,
    aggregator: Aggregator,
    pipeline: Pipeline,
    exporter: Option<Box<dyn Exporter>>,
}

impl Engine {
    /// Engine with no exporter. Use [`Engine::with_exporter`] to add one.
    pub fn new(config: RunConfig, aggregator: Aggregator, pipeline: Pipeline) -> Self {
        Self {
            config,
            aggregator,
            pipeline,
            exporter: None,
        }
    }

    /// Wire the production components from `config`: hickory resolution,
    /// HTTPS probing, builtin correlation (unless disabled), JSON export.
    pub fn build(
        config: RunConfig,
        sources: Vec<Arc<dyn SubdomainSource>>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let mut aggregator = Aggregator::new(sources);
        if let Some(deadline) = config.aggregation_timeout {
            aggregator = aggregator.with_deadline(deadline);
        }

        let resolver = Arc::new(DnsResolver::from_servers(&config.resolvers)?);
        let prober = Arc::new(HttpsProber::new(DEFAULT_PROBE_TIMEOUT)?);
        let correlation = if config.correlate {
            CorrelationStage::builtin()
        } else {
            CorrelationStage::identity()
        };
        let pipeline = Pipeline::standard(resolver, prober, correlation, config.threads);

        let exporter = config.output.clone();
        let mut engine = Self::new(config, aggregator, pipeline);
        if let Some(path) = exporter.filter(|p| !p.as_os_str().is_empty()) {
            engine = engine.with_exporter(JsonFileExporter::new(path));
        }
        Ok(engine)
    }

    pub fn with_exporter(mut self, exporter: impl Exporter + 'static) -> Self {
        self.exporter = Some(Box::new(exporter));
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Aggregate every domain, enrich the union, export it.
    ///
    /// Source, lookup and probe failures never fail the run. Only export
    /// errors do. Cancellation cuts aggregation short; enrichment and
    /// export still happen on whatever was collected.
    pub async fn run(&self, cancel: &CancelSignal) -> Result<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id);
        self.run_inner(run_id, cancel).instrument(span).await
    }

    async fn run_inner(&self, run_id: String, cancel: &CancelSignal) -> Result<RunReport> {
        let started = Instant::now();
        obs::emit_run_started(
            &run_id,
            self.config.domains.len(),
            self.aggregator.sources().len(),
        );

        let mut accumulated: BTreeMap<String, Candidate> = BTreeMap::new();
        let mut domains = Vec::with_capacity(self.config.domains.len());

        if self.config.active_only {
            info!("active-only mode: passive sources skipped, active enumeration is unavailable");
        }

        for domain in &self.config.domains {
            if self.config.active_only {
                domains.push(DomainReport {
                    domain: domain.clone(),
                    candidates: 0,
                    failed_sources: 0,
                    error: None,
                    cancelled: false,
                });
                continue;
            }

            let result = self.aggregator.aggregate(domain, cancel).await;
            domains.push(DomainReport {
                domain: result.domain.clone(),
                candidates: result.candidates.len(),
                failed_sources: result.failed_count(),
                error: result.error.as_ref().map(ToString::to_string),
                cancelled: result.was_cancelled(),
            });
            for candidate in result.candidates {
                accumulated
                    .entry(candidate.name().to_string())
                    .or_insert(candidate);
            }
        }

        let (mut candidates, stages) = self
            .pipeline
            .run(accumulated.into_values().collect())
            .await;
        candidates.sort_by(|a, b| (a.domain(), a.name()).cmp(&(b.domain(), b.name())));

        let total = candidates.len();
        let resolved = candidates.iter().filter(|c| c.is_resolved()).count();
        let alive = candidates.iter().filter(|c| c.alive).count();

        let exported = match &self.exporter {
            Some(exporter) => exporter
                .export(candidates)
                .map(|_| Some(exporter.target())),
            None => {
                warn!("no output path configured; skipping export");
                Ok(None)
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        METRICS.flush();
        let exported_to = match exported {
            Ok(target) => target,
            Err(e) => {
                obs::emit_run_failed(&run_id, duration_ms, &e);
                return Err(e.into());
            }
        };
        obs::emit_run_finished(&run_id, duration_ms, total, alive);

        Ok(RunReport {
            run_id,
            domains,
            stages,
            total,
            resolved,
            alive,
            exported_to,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageOutput;
    use async_trait::async_trait;

    fn candidate(name: &str) -> Candidate {
        Candidate::new(name, "example.com", "test").unwrap()
    }

    /// Misbehaving stage that drops everything after the first candidate.
    struct Truncate;

    #[async_trait]
    impl Stage for Truncate {
        fn name(&self) -> &str {
            "truncate"
        }

        async fn run(&self, mut candidates: Vec<Candidate>) -> StageOutput {
            candidates.truncate(1);
            StageOutput::unchanged(candidates)
        }
    }

    /// Well-behaved stage that tags every candidate.
    struct Mark;

    #[async_trait]
    impl Stage for Mark {
        fn name(&self) -> &str {
            "mark"
        }

        async fn run(&self, mut candidates: Vec<Candidate>) -> StageOutput {
            for c in candidates.iter_mut() {
                c.tags.insert("seen".to_string());
            }
            StageOutput::unchanged(candidates)
        }
    }

    #[tokio::test]
    async fn test_membership_change_is_discarded() {
        let pipeline = Pipeline::new().with_stage(Truncate).with_stage(Mark);
        assert_eq!(pipeline.stage_names(), vec!["truncate", "mark"]);

        let (out, reports) = pipeline
            .run(vec![candidate("a.example.com"), candidate("b.example.com")])
            .await;

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.tags.contains("seen")));
        assert!(reports[0].discarded);
        assert!(!reports[1].discarded);
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_identity() {
        let (out, reports) = Pipeline::new().run(vec![candidate("a.example.com")]).await;
        assert_eq!(out.len(), 1);
        assert!(reports.is_empty());
    }

    #[test]
    fn test_same_members_ignores_order() {
        let a = vec![candidate("a.example.com"), candidate("b.example.com")];
        let b = vec![candidate("b.example.com"), candidate("a.example.com")];
        assert!(same_members(&a, &b));
        assert!(!same_members(&a, &b[..1]));
    }

    #[test]
    fn test_run_report_counts() {
        let report = RunReport {
            run_id: "run123".to_string(),
            domains: vec![DomainReport {
                domain: "example.com".to_string(),
                candidates: 3,
                failed_sources: 1,
                error: Some("aggregation for example.com cancelled".to_string()),
                cancelled: true,
            }],
            stages: vec![StageReport {
                stage: "resolution".to_string(),
                warnings: vec![StageWarning {
                    host: "x.example.com".to_string(),
                    detail: "NXDOMAIN".to_string(),
                }],
                duration_ms: 4,
                discarded: false,
            }],
            total: 3,
            resolved: 2,
            alive: 1,
            exported_to: None,
            duration_ms: 10,
        };
        assert_eq!(report.warning_count(), 1);
        assert!(report.was_cancelled());
    }
}
