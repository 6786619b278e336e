//! Observability tests for ArgusEnum run lifecycle tracing.
//!
//! These tests verify that structured tracing events are emitted for the
//! key lifecycle points: run start, source outcome, stage completion,
//! export and run finish.

use std::sync::Arc;

use argusenum_core::obs::{
    emit_aggregation_finished, emit_export_written, emit_run_finished, emit_run_started,
    emit_source_failed, emit_stage_warning, run_span,
};
use argusenum_core::{
    AggregateError, Aggregator, CancelSignal, Engine, JsonFileExporter, Pipeline, RunConfig,
    SourceError, SourceResult, SubdomainSource,
};
use async_trait::async_trait;
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_run_started_logs_run_id() {
    emit_run_started("run-123", 2, 12);
    assert!(logs_contain("run.started"));
    assert!(logs_contain("run-123"));
}

#[traced_test]
#[test]
fn test_emit_run_finished_logs_totals() {
    emit_run_finished("run-456", 5000, 42, 7);
    assert!(logs_contain("run.finished"));
    assert!(logs_contain("alive=7"));
}

#[traced_test]
#[test]
fn test_emit_source_failed_logs_warning() {
    let error = SourceError::Transport {
        provider: "otx".to_string(),
        detail: "connection reset".to_string(),
    };
    emit_source_failed("example.com", "otx", &error);
    assert!(logs_contain("WARN"));
    assert!(logs_contain("source.failed"));
    assert!(logs_contain("connection reset"));
}

#[traced_test]
#[test]
fn test_cancelled_aggregation_is_a_warning() {
    let err = AggregateError::Cancelled {
        domain: "example.com".to_string(),
    };
    emit_aggregation_finished("example.com", 3, Some(&err), 120);
    assert!(logs_contain("aggregation.cancelled"));
}

#[traced_test]
#[test]
fn test_stage_warning_and_export_events() {
    emit_stage_warning("resolution", "gone.example.com", &"NXDOMAIN");
    emit_export_written(std::path::Path::new("results.json"), 4);
    assert!(logs_contain("stage.warning"));
    assert!(logs_contain("gone.example.com"));
    assert!(logs_contain("export.written"));
}

#[traced_test]
#[test]
fn test_run_span_enter_creates_span() {
    let span = run_span("test-span-run");
    let _guard = span.enter();
    tracing::info!("inside run span");
    assert!(logs_contain("test-span-run"));
}

struct OneHost;

#[async_trait]
impl SubdomainSource for OneHost {
    fn name(&self) -> &str {
        "one"
    }

    async fn enumerate(&self, _cancel: &CancelSignal, _domain: &str) -> SourceResult {
        Ok(vec!["www.example.com".to_string()])
    }
}

#[traced_test]
#[tokio::test]
async fn test_engine_run_emits_lifecycle_events() {
    let engine = Engine::new(
        RunConfig::for_domains(["example.com"]),
        Aggregator::new(vec![Arc::new(OneHost)]),
        Pipeline::new().with_stage(argusenum_core::CorrelationStage::builtin()),
    );
    let report = engine.run(&CancelSignal::never()).await.unwrap();

    assert!(logs_contain("run.started"));
    assert!(logs_contain("source.finished"));
    assert!(logs_contain("aggregation.finished"));
    assert!(logs_contain("stage.finished"));
    assert!(logs_contain("run.finished"));
    assert!(logs_contain(&report.run_id));
}

#[traced_test]
#[tokio::test]
async fn test_failed_export_still_flushes_metrics_and_logs_run_end() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(
        RunConfig::for_domains(["example.com"]),
        Aggregator::new(vec![Arc::new(OneHost)]),
        Pipeline::new(),
    )
    .with_exporter(JsonFileExporter::new(dir.path().join("missing/dir/out.json")));

    assert!(engine.run(&CancelSignal::never()).await.is_err());
    assert!(logs_contain("sources_queried="));
    assert!(logs_contain("run.failed"));
    assert!(logs_contain("failed to write"));
}
