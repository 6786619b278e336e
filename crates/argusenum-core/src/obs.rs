//! Structured observability hooks for run lifecycle events.
//!
//! This module provides:
//! - A run-scoped tracing span via [`run_span`]
//! - Emission functions for key lifecycle events: run start, source
//!   outcome, aggregation, stage completion, export, run finish or failure
//!
//! Events are emitted at `info!` level, failures at `warn!`. Filtering goes
//! through `RUST_LOG`; JSON output through `--json`.

use std::fmt::Display;
use std::path::Path;

use tracing::{info, warn};

use crate::domain::AggregateError;

/// Span tagging every event of one run with its `run_id`.
///
/// # Example
///
/// ```ignore
/// engine_future.instrument(run_span("1b4e28ba-2fa1-11d2-883f-0016d3cca427")).await
/// ```
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("argusenum.run", run_id = %run_id)
}

/// Emit event: run started.
pub fn emit_run_started(run_id: &str, domains: usize, sources: usize) {
    info!(event = "run.started", run_id = %run_id, domains = domains, sources = sources);
}

/// Emit event: one source returned for one domain.
pub fn emit_source_finished(domain: &str, source: &str, found: usize, merged: usize) {
    info!(
        event = "source.finished",
        domain = %domain,
        source = %source,
        found = found,
        merged = merged,
    );
}

/// Emit event: one source failed for one domain (warning level).
pub fn emit_source_failed(domain: &str, source: &str, error: &dyn Display) {
    warn!(event = "source.failed", domain = %domain, source = %source, error = %error);
}

/// Emit event: aggregation for a domain completed, possibly early.
pub fn emit_aggregation_finished(
    domain: &str,
    candidates: usize,
    error: Option<&AggregateError>,
    duration_ms: u64,
) {
    match error {
        Some(err) if err.is_cancellation() => warn!(
            event = "aggregation.cancelled",
            domain = %domain,
            candidates = candidates,
            duration_ms = duration_ms,
            error = %err,
        ),
        Some(err) => info!(
            event = "aggregation.finished",
            domain = %domain,
            candidates = candidates,
            duration_ms = duration_ms,
            first_error = %err,
        ),
        None => info!(
            event = "aggregation.finished",
            domain = %domain,
            candidates = candidates,
            duration_ms = duration_ms,
        ),
    }
}

/// Emit event: a pipeline stage finished.
pub fn emit_stage_finished(stage: &str, candidates: usize, warnings: usize, duration_ms: u64) {
    info!(
        event = "stage.finished",
        stage = %stage,
        candidates = candidates,
        warnings = warnings,
        duration_ms = duration_ms,
    );
}

/// Emit event: a per-candidate stage problem (warning level).
pub fn emit_stage_warning(stage: &str, host: &str, detail: &dyn Display) {
    warn!(event = "stage.warning", stage = %stage, host = %host, detail = %detail);
}

/// Emit event: results written.
pub fn emit_export_written(path: &Path, records: usize) {
    info!(event = "export.written", path = %path.display(), records = records);
}

/// Emit event: run finished.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, candidates: usize, alive: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        candidates = candidates,
        alive = alive,
    );
}

/// Emit event: run ended by a fatal error after all work was done.
pub fn emit_run_failed(run_id: &str, duration_ms: u64, error: &dyn Display) {
    warn!(
        event = "run.failed",
        run_id = %run_id,
        duration_ms = duration_ms,
        error = %error,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let span = run_span("test-run-id");
        let _entered = span.enter();
    }
}
