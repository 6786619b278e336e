//! The contract every intelligence provider adapter implements.

use std::time::Duration;

use async_trait::async_trait;

use crate::cancel::CancelSignal;
use crate::domain::SourceError;

/// Budget used when an adapter does not declare its own.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one `enumerate` call.
pub type SourceResult = std::result::Result<Vec<String>, SourceError>;

/// A passive intelligence provider queried for hostnames under a domain.
///
/// Implementations own their HTTP client and credentials and must:
/// - return `Ok(vec![])` without error when a required credential is absent;
/// - map any non-success status to [`SourceError::Status`] with a bounded
///   body excerpt, without retrying;
/// - only return names that are normalized, in scope of `domain` and
///   deduplicated (see [`crate::scoped_hosts`]);
/// - report malformed payloads as [`SourceError::Decode`].
#[async_trait]
pub trait SubdomainSource: Send + Sync {
    /// Stable identifier used for provenance and logging.
    fn name(&self) -> &str;

    /// Upper bound on one `enumerate` call.
    fn timeout(&self) -> Duration {
        DEFAULT_SOURCE_TIMEOUT
    }

    /// Query the provider once for `domain`.
    async fn enumerate(&self, cancel: &CancelSignal, domain: &str) -> SourceResult;
}
