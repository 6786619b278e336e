//! Error taxonomy for ArgusEnum.
//!
//! Only [`ConfigError`] and [`ExportError`] ever reach the process boundary.
//! Everything else is recovered where it happens and surfaces as a log line
//! or a diagnostic field on a report.

use std::path::PathBuf;
use std::time::Duration;

/// Invalid run configuration, raised before any pipeline work starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no target domains supplied")]
    NoDomains,

    #[error("pass either a single domain or a domain list, not both")]
    ConflictingTargets,

    #[error("passive-only and active-only modes are mutually exclusive")]
    ConflictingModes,

    #[error("worker thread count must be at least 1")]
    InvalidThreads,

    #[error("unknown source '{name}' (known: {known})")]
    UnknownSource { name: String, known: String },

    #[error("failed to read {kind} file {path:?}: {source}")]
    ReadFile {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid resolver on line {line}: {value}")]
    InvalidResolver { line: usize, value: String },

    #[error("resolvers file {0:?} lists no resolvers")]
    EmptyResolvers(PathBuf),

    #[error("failed to initialise DNS resolver: {0}")]
    Resolver(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failure of one adapter for one domain (ProviderError).
///
/// Never fatal: the aggregator records it and carries on with the other
/// adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("{provider} returned status {status}: {excerpt}")]
    Status {
        provider: String,
        status: u16,
        excerpt: String,
    },

    #[error("{provider} request failed: {detail}")]
    Transport { provider: String, detail: String },

    #[error("{provider} response could not be decoded: {detail}")]
    Decode { provider: String, detail: String },

    #[error("{provider} timed out after {after:?}")]
    Timeout { provider: String, after: Duration },
}

/// Outcome-level error of one aggregation. Carries no candidates; the
/// merged set travels alongside it in [`crate::AggregationResult`].
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("aggregation for {domain} cancelled")]
    Cancelled { domain: String },

    #[error("aggregation for {domain} exceeded its {after:?} deadline")]
    DeadlineExceeded { domain: String, after: Duration },

    #[error("source {source_name} failed: {error}")]
    Source {
        source_name: String,
        #[source]
        error: SourceError,
    },

    #[error("source {source_name} task aborted: {detail}")]
    TaskFailed { source_name: String, detail: String },
}

impl AggregateError {
    /// Whether this error reports cancellation or deadline expiry rather
    /// than a provider failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            AggregateError::Cancelled { .. } | AggregateError::DeadlineExceeded { .. }
        )
    }
}

/// DNS lookup failure for one candidate (NetworkError).
#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
    #[error("lookup for {host} failed: {detail}")]
    Failed { host: String, detail: String },

    #[error("lookup for {host} timed out after {after:?}")]
    Timeout { host: String, after: Duration },
}

/// Liveness probe failure for one candidate (NetworkError).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    #[error("probe of {url} timed out")]
    Timeout { url: String },

    #[error("probe of {url} could not connect: {detail}")]
    Connect { url: String, detail: String },

    #[error("probe of {url} failed: {detail}")]
    Other { url: String, detail: String },
}

/// Failure writing the final result set. Fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum ArgusError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

/// Result type for run-level operations.
pub type Result<T> = std::result::Result<T, ArgusError>;
