//! Run configuration and the target/resolver file loaders.

use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{normalize, ConfigError};

/// Default worker pool width for the network-bound stages.
pub const DEFAULT_THREADS: usize = 64;

/// Default output file.
pub const DEFAULT_OUTPUT: &str = "results.json";

/// Default per-domain aggregation deadline.
pub const DEFAULT_AGGREGATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Where targets come from. Exactly one must be set.
#[derive(Debug, Clone, Default)]
pub struct TargetSpec {
    pub domain: Option<String>,
    pub list: Option<PathBuf>,
}

/// Everything a run needs, immutable once the engine is built.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Normalized, deduplicated root domains in input order.
    pub domains: Vec<String>,
    /// Export path; `None` skips the export.
    pub output: Option<PathBuf>,
    pub passive_only: bool,
    pub active_only: bool,
    /// Custom DNS servers; empty means the system configuration.
    pub resolvers: Vec<SocketAddr>,
    pub threads: usize,
    /// Per-domain aggregation deadline; `None` waits for every source.
    pub aggregation_timeout: Option<Duration>,
    /// Source allow-list; empty means every configured source.
    pub sources: Vec<String>,
    /// Run the builtin correlation enrichers.
    pub correlate: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            output: Some(PathBuf::from(DEFAULT_OUTPUT)),
            passive_only: false,
            active_only: false,
            resolvers: Vec::new(),
            threads: DEFAULT_THREADS,
            aggregation_timeout: Some(DEFAULT_AGGREGATION_TIMEOUT),
            sources: Vec::new(),
            correlate: true,
        }
    }
}

impl RunConfig {
    /// Config for the given raw domains with every other field defaulted.
    pub fn for_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: dedup_domains(domains),
            ..Self::default()
        }
    }

    /// Resolve a [`TargetSpec`] into a config, reading the list file if given.
    pub fn from_targets(targets: &TargetSpec) -> Result<Self, ConfigError> {
        let domains = match (&targets.domain, &targets.list) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingTargets),
            (None, None) => return Err(ConfigError::NoDomains),
            (Some(domain), None) => dedup_domains([domain]),
            (None, Some(path)) => load_domain_list(path)?,
        };
        Ok(Self {
            domains,
            ..Self::default()
        })
    }

    /// Check cross-field constraints. Runs before any network activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domains.is_empty() {
            return Err(ConfigError::NoDomains);
        }
        if self.passive_only && self.active_only {
            return Err(ConfigError::ConflictingModes);
        }
        if self.threads == 0 {
            return Err(ConfigError::InvalidThreads);
        }
        Ok(())
    }
}

fn dedup_domains<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    raw.into_iter()
        .map(|d| normalize(d.as_ref()))
        .filter(|d| !d.is_empty() && seen.insert(d.clone()))
        .collect()
}

/// Parse a newline-separated domain list. Blank lines and `#` comments are
/// skipped; entries are normalized and deduplicated, first occurrence wins.
pub fn parse_domain_list(text: &str) -> Vec<String> {
    dedup_domains(
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#')),
    )
}

/// Read and parse a domain list file.
pub fn load_domain_list(path: &Path) -> Result<Vec<String>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        kind: "domain list",
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_domain_list(&text))
}

/// Parse one resolver per line: `IP` (port 53 implied) or `IP:PORT`.
/// IPv6 addresses with a port use the bracketed `[addr]:port` form.
pub fn parse_resolvers(text: &str) -> Result<Vec<SocketAddr>, ConfigError> {
    let mut servers = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let addr = line
            .parse::<SocketAddr>()
            .or_else(|_| line.parse::<IpAddr>().map(|ip| SocketAddr::new(ip, 53)))
            .map_err(|_| ConfigError::InvalidResolver {
                line: idx + 1,
                value: line.to_string(),
            })?;
        if !servers.contains(&addr) {
            servers.push(addr);
        }
    }
    Ok(servers)
}

/// Read a resolvers file. A file with no usable entries is an error.
pub fn load_resolvers(path: &Path) -> Result<Vec<SocketAddr>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        kind: "resolvers",
        path: path.to_path_buf(),
        source,
    })?;
    let servers = parse_resolvers(&text)?;
    if servers.is_empty() {
        return Err(ConfigError::EmptyResolvers(path.to_path_buf()));
    }
    Ok(servers)
}
