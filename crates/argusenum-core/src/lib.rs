//! ArgusEnum Core Library
//!
//! Concurrent multi-source subdomain aggregation and the staged enrichment
//! pipeline (resolution, liveness, correlation) that consumes its output.

pub mod aggregator;
pub mod cancel;
pub mod config;
pub mod domain;
pub mod export;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod source;
pub mod stage;
pub mod telemetry;

pub use aggregator::{AggregationResult, Aggregator, SourceReport, SourceStatus};
pub use cancel::{cancellation, CancelSignal, Canceller};
pub use config::{
    load_domain_list, load_resolvers, parse_domain_list, parse_resolvers, RunConfig, TargetSpec,
    DEFAULT_AGGREGATION_TIMEOUT, DEFAULT_OUTPUT, DEFAULT_THREADS,
};
pub use domain::{
    is_subdomain_of, join_label, normalize, scoped_hosts, AggregateError, ArgusError, Candidate,
    ConfigError, ExportError, LookupError, ProbeError, Result, SourceError,
};
pub use export::{write_candidates_json, Exporter, JsonFileExporter};
pub use pipeline::{DomainReport, Engine, Pipeline, RunReport, StageReport};
pub use source::{SourceResult, SubdomainSource, DEFAULT_SOURCE_TIMEOUT};
pub use stage::{
    BuiltinStage, CorrelationStage, DnsResolver, Enricher, EnvironmentTagger, ExposureTagger,
    HostResolver, HttpsProber, LivenessStage, Prober, ResolutionStage, Stage, StageOutput,
    StageWarning,
};

/// Crate version, shown in the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
