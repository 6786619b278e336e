//! Enrichment stage definitions.
//!
//! A stage takes the whole candidate set and returns it with more
//! information attached. Stages never add, drop or rename candidates;
//! per-candidate problems come back as [`StageWarning`]s.

use async_trait::async_trait;

use crate::domain::Candidate;

pub mod correlate;
pub mod liveness;
pub mod pool;
pub mod resolve;

pub use correlate::{CorrelationStage, Enricher, EnvironmentTagger, ExposureTagger};
pub use liveness::{HttpsProber, LivenessStage, Prober, DEFAULT_PROBE_TIMEOUT};
pub use resolve::{DnsResolver, HostResolver, ResolutionStage, DEFAULT_LOOKUP_TIMEOUT};

/// Builtin enrichment stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinStage {
    /// Hostname → addresses.
    Resolution,

    /// HTTPS reachability and status code.
    Liveness,

    /// Tagging from signals gathered by the earlier stages.
    Correlation,
}

impl BuiltinStage {
    /// Fixed execution order.
    pub const ORDER: [BuiltinStage; 3] = [
        BuiltinStage::Resolution,
        BuiltinStage::Liveness,
        BuiltinStage::Correlation,
    ];

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStage::Resolution => "resolution",
            BuiltinStage::Liveness => "liveness",
            BuiltinStage::Correlation => "correlation",
        }
    }
}

/// A recoverable problem with one candidate during a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageWarning {
    pub host: String,
    pub detail: String,
}

/// Candidates after a stage, plus what went wrong along the way.
#[derive(Debug, Default)]
pub struct StageOutput {
    pub candidates: Vec<Candidate>,
    pub warnings: Vec<StageWarning>,
}

impl StageOutput {
    /// Output carrying `candidates` untouched and no warnings.
    pub fn unchanged(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            warnings: Vec::new(),
        }
    }
}

/// One step of the enrichment pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name used in logs and reports.
    fn name(&self) -> &str;

    /// Transform the full set. Output must hold the same names as input.
    async fn run(&self, candidates: Vec<Candidate>) -> StageOutput;
}
