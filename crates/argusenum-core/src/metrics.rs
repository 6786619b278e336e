//! Global atomic counters for run observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters. No allocations and no locking.
pub struct Metrics {
    sources_queried: AtomicU64,
    sources_failed: AtomicU64,
    candidates_merged: AtomicU64,
    lookups_failed: AtomicU64,
    probes_failed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            sources_queried: AtomicU64::new(0),
            sources_failed: AtomicU64::new(0),
            candidates_merged: AtomicU64::new(0),
            lookups_failed: AtomicU64::new(0),
            probes_failed: AtomicU64::new(0),
        }
    }

    /// Increment the sources-queried counter by one.
    pub fn inc_sources_queried(&self) {
        self.sources_queried.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "sources_queried", "counter incremented");
    }

    /// Increment the sources-failed counter by one.
    pub fn inc_sources_failed(&self) {
        self.sources_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "sources_failed", "counter incremented");
    }

    /// Add newly merged candidates.
    pub fn add_candidates_merged(&self, n: u64) {
        self.candidates_merged.fetch_add(n, Ordering::Relaxed);
    }

    /// Increment the lookups-failed counter by one.
    pub fn inc_lookups_failed(&self) {
        self.lookups_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "lookups_failed", "counter incremented");
    }

    /// Increment the probes-failed counter by one.
    pub fn inc_probes_failed(&self) {
        self.probes_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "probes_failed", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a run) rather than on every
    /// increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            sources_queried = self.sources_queried(),
            sources_failed = self.sources_failed(),
            candidates_merged = self.candidates_merged(),
            lookups_failed = self.lookups_failed(),
            probes_failed = self.probes_failed(),
        );
    }

    pub fn sources_queried(&self) -> u64 {
        self.sources_queried.load(Ordering::Relaxed)
    }

    pub fn sources_failed(&self) -> u64 {
        self.sources_failed.load(Ordering::Relaxed)
    }

    pub fn candidates_merged(&self) -> u64 {
        self.candidates_merged.load(Ordering::Relaxed)
    }

    pub fn lookups_failed(&self) -> u64 {
        self.lookups_failed.load(Ordering::Relaxed)
    }

    pub fn probes_failed(&self) -> u64 {
        self.probes_failed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.sources_queried.store(0, Ordering::Relaxed);
        self.sources_failed.store(0, Ordering::Relaxed);
        self.candidates_merged.store(0, Ordering::Relaxed);
        self.lookups_failed.store(0, Ordering::Relaxed);
        self.probes_failed.store(0, Ordering::Relaxed);
    }
}
