//! Domain models for ArgusEnum.
//!
//! - `normalize`: canonical hostname form and scope predicate
//! - `Candidate`: a discovered hostname and its enrichment fields
//! - `error`: the error taxonomy shared by every layer

pub mod candidate;
pub mod error;
pub mod normalize;

pub use candidate::Candidate;
pub use error::{
    AggregateError, ArgusError, ConfigError, ExportError, LookupError, ProbeError, Result,
    SourceError,
};
pub use normalize::{is_subdomain_of, join_label, normalize, scoped_hosts};
