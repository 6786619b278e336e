//! Fan-out / fan-in over subdomain sources.
//!
//! [`Aggregator`] runs every configured [`SubdomainSource`] concurrently for
//! one domain and merges what they report into a single deduplicated
//! candidate set. A failing, panicking or slow source never prevents the
//! others from being collected.

use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::cancel::CancelSignal;
use crate::domain::{normalize, AggregateError, Candidate, SourceError};
use crate::metrics::METRICS;
use crate::obs;
use crate::source::SubdomainSource;

/// How one source fared during an aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// Returned successfully; `found` is what it reported, `merged` what was
    /// new to the set.
    Completed { found: usize, merged: usize },
    /// Returned an error or panicked.
    Failed { error: String },
    /// Still running, or abandoned, when the aggregation was cancelled.
    Unfinished,
}

/// Per-source line of an [`AggregationResult`].
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub status: SourceStatus,
    pub duration_ms: u64,
}

/// Merged output of one aggregation.
///
/// `error` is diagnostic only: a non-`None` error does not make
/// `candidates` invalid.
#[derive(Debug)]
pub struct AggregationResult {
    /// Normalized domain that was enumerated.
    pub domain: String,
    /// Unique candidates, sorted by name.
    pub candidates: Vec<Candidate>,
    /// First source error seen, or the cancellation that ended collection.
    pub error: Option<AggregateError>,
    /// One entry per configured source.
    pub reports: Vec<SourceReport>,
}

impl AggregationResult {
    /// Candidate names, in set order.
    pub fn names(&self) -> BTreeSet<String> {
        self.candidates.iter().map(|c| c.name().to_string()).collect()
    }

    /// Number of sources that failed.
    pub fn failed_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, SourceStatus::Failed { .. }))
            .count()
    }

    /// Whether collection ended early because of cancellation or deadline.
    pub fn was_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(AggregateError::is_cancellation)
    }
}

enum Outcome {
    Found(Vec<String>),
    Failed(SourceError),
    Panicked(String),
}

struct Finished {
    index: usize,
    outcome: Outcome,
    duration_ms: u64,
}

/// Merge set scoped to one aggregation. Case-insensitive by construction:
/// candidate names are normalized before they are used as keys.
struct MergeSet {
    domain: String,
    by_name: HashMap<String, Candidate>,
}

impl MergeSet {
    fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            by_name: HashMap::new(),
        }
    }

    /// Merge `hosts` tagged with `source`; returns how many were new.
    fn merge(&mut self, source: &str, hosts: &[String]) -> usize {
        let mut added = 0;
        for raw in hosts {
            let Some(candidate) = Candidate::new(raw, &self.domain, source) else {
                debug!(source = %source, host = %raw, "dropping out-of-scope host");
                continue;
            };
            if !self.by_name.contains_key(candidate.name()) {
                self.by_name.insert(candidate.name().to_string(), candidate);
                added += 1;
            }
        }
        added
    }

    fn into_sorted(self) -> Vec<Candidate> {
        let mut out: Vec<Candidate> = self.by_name.into_values().collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }
}

/// Runs all sources for a domain and merges their findings.
pub struct Aggregator {
    sources: Vec<Arc<dyn SubdomainSource>>,
    deadline: Option<Duration>,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn SubdomainSource>>) -> Self {
        Self {
            sources,
            deadline: None,
        }
    }

    /// Stop waiting for outstanding sources after `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Configured sources, in registration order.
    pub fn sources(&self) -> &[Arc<dyn SubdomainSource>] {
        &self.sources
    }

    /// Enumerate `domain` across every source.
    ///
    /// All `enumerate` calls are fired concurrently, each bounded by its
    /// source's own timeout. Collection stops early when `cancel` fires or
    /// the aggregation deadline passes; the candidates merged so far are
    /// returned with the cancellation as the reported error, and the
    /// outstanding tasks are aborted.
    pub async fn aggregate(&self, domain: &str, cancel: &CancelSignal) -> AggregationResult {
        let domain = normalize(domain);
        let started = Instant::now();
        let mut join_set = JoinSet::new();

        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let domain = domain.clone();
            let cancel = cancel.clone();
            join_set.spawn(async move {
                let begun = Instant::now();
                let budget = source.timeout();
                let call = AssertUnwindSafe(source.enumerate(&cancel, &domain)).catch_unwind();
                let outcome = match tokio::time::timeout(budget, call).await {
                    Ok(Ok(Ok(hosts))) => Outcome::Found(hosts),
                    Ok(Ok(Err(error))) => Outcome::Failed(error),
                    Ok(Err(panic)) => Outcome::Panicked(panic_message(panic.as_ref())),
                    Err(_) => Outcome::Failed(SourceError::Timeout {
                        provider: source.name().to_string(),
                        after: budget,
                    }),
                };
                Finished {
                    index,
                    outcome,
                    duration_ms: begun.elapsed().as_millis() as u64,
                }
            });
        }

        let mut merged = MergeSet::new(&domain);
        let mut first_error: Option<AggregateError> = None;
        let mut reports: Vec<Option<SourceReport>> = vec![None; self.sources.len()];

        let deadline = self.deadline;
        let expiry = async move {
            match deadline {
                Some(after) => tokio::time::sleep(after).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expiry);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    first_error = Some(AggregateError::Cancelled { domain: domain.clone() });
                    break;
                }
                joined = join_set.join_next() => {
                    let Some(joined) = joined else { break };
                    // Sources watch the same signal; whatever they return after
                    // it trips is an abandoned call, not a result.
                    if cancel.is_cancelled() {
                        first_error = Some(AggregateError::Cancelled { domain: domain.clone() });
                        break;
                    }
                    let finished = match joined {
                        Ok(finished) => finished,
                        Err(e) => {
                            warn!(domain = %domain, error = %e, "source task ended abnormally");
                            continue;
                        }
                    };
                    let name = self.sources[finished.index].name().to_string();
                    let status = self.record(&domain, &name, finished.outcome, &mut merged, &mut first_error);
                    reports[finished.index] = Some(SourceReport {
                        source: name,
                        status,
                        duration_ms: finished.duration_ms,
                    });
                }
                _ = &mut expiry => {
                    first_error = Some(AggregateError::DeadlineExceeded {
                        domain: domain.clone(),
                        after: deadline.unwrap_or_default(),
                    });
                    break;
                }
            }
        }
        join_set.abort_all();

        let reports = reports
            .into_iter()
            .zip(&self.sources)
            .map(|(slot, source)| {
                slot.unwrap_or_else(|| SourceReport {
                    source: source.name().to_string(),
                    status: SourceStatus::Unfinished,
                    duration_ms: started.elapsed().as_millis() as u64,
                })
            })
            .collect();

        let candidates = merged.into_sorted();
        obs::emit_aggregation_finished(
            &domain,
            candidates.len(),
            first_error.as_ref(),
            started.elapsed().as_millis() as u64,
        );

        AggregationResult {
            domain,
            candidates,
            error: first_error,
            reports,
        }
    }

    fn record(
        &self,
        domain: &str,
        name: &str,
        outcome: Outcome,
        merged: &mut MergeSet,
        first_error: &mut Option<AggregateError>,
    ) -> SourceStatus {
        METRICS.inc_sources_queried();
        match outcome {
            Outcome::Found(hosts) => {
                let added = merged.merge(name, &hosts);
                METRICS.add_candidates_merged(added as u64);
                obs::emit_source_finished(domain, name, hosts.len(), added);
                SourceStatus::Completed {
                    found: hosts.len(),
                    merged: added,
                }
            }
            Outcome::Failed(error) => {
                METRICS.inc_sources_failed();
                obs::emit_source_failed(domain, name, &error);
                let status = SourceStatus::Failed {
                    error: error.to_string(),
                };
                first_error.get_or_insert(AggregateError::Source {
                    source_name: name.to_string(),
                    error,
                });
                status
            }
            Outcome::Panicked(detail) => {
                METRICS.inc_sources_failed();
                obs::emit_source_failed(domain, name, &detail);
                let status = SourceStatus::Failed {
                    error: detail.clone(),
                };
                first_error.get_or_insert(AggregateError::TaskFailed {
                    source_name: name.to_string(),
                    detail,
                });
                status
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
