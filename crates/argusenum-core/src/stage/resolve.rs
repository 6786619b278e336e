//! Resolution stage: hostname → DNS addresses.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::TokioResolver;

use crate::domain::{Candidate, ConfigError, LookupError};
use crate::metrics::METRICS;
use crate::obs;
use crate::stage::pool::run_pool;
use crate::stage::{BuiltinStage, Stage, StageOutput, StageWarning};

/// Per-lookup budget.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Injectable address lookup.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Addresses for `host`, in answer order.
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, LookupError>;
}

/// hickory-backed resolver, using either the system configuration or an
/// explicit list of name servers.
pub struct DnsResolver {
    inner: TokioResolver,
    timeout: Duration,
}

impl DnsResolver {
    /// Resolver configured from the host's system settings.
    pub fn system() -> Result<Self, ConfigError> {
        let inner = TokioResolver::builder(TokioConnectionProvider::default())
            .map_err(|e| ConfigError::Resolver(e.to_string()))?
            .build();
        Ok(Self {
            inner,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        })
    }

    /// Resolver querying only `servers` over UDP.
    pub fn with_nameservers(servers: &[SocketAddr]) -> Self {
        let mut config = ResolverConfig::new();
        for addr in servers {
            config.add_name_server(NameServerConfig::new(*addr, Protocol::Udp));
        }
        let inner =
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default()).build();
        Self {
            inner,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// System resolver when `servers` is empty, explicit servers otherwise.
    pub fn from_servers(servers: &[SocketAddr]) -> Result<Self, ConfigError> {
        if servers.is_empty() {
            Self::system()
        } else {
            Ok(Self::with_nameservers(servers))
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl HostResolver for DnsResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, LookupError> {
        // Fully qualified so the search list is never appended.
        let fqdn = format!("{host}.");
        let answer = tokio::time::timeout(self.timeout, self.inner.lookup_ip(fqdn))
            .await
            .map_err(|_| LookupError::Timeout {
                host: host.to_string(),
                after: self.timeout,
            })?
            .map_err(|e| LookupError::Failed {
                host: host.to_string(),
                detail: e.to_string(),
            })?;
        Ok(answer.iter().collect())
    }
}

/// Attaches resolved addresses to every candidate.
pub struct ResolutionStage {
    resolver: Arc<dyn HostResolver>,
    width: usize,
}

impl ResolutionStage {
    pub fn new(resolver: Arc<dyn HostResolver>, width: usize) -> Self {
        Self { resolver, width }
    }
}

#[async_trait]
impl Stage for ResolutionStage {
    fn name(&self) -> &str {
        BuiltinStage::Resolution.name()
    }

    async fn run(&self, candidates: Vec<Candidate>) -> StageOutput {
        let started = Instant::now();
        let output = run_pool(candidates, self.width, |mut candidate| {
            let resolver = Arc::clone(&self.resolver);
            async move {
                match resolver.lookup(candidate.name()).await {
                    Ok(ips) => {
                        for ip in ips {
                            if !candidate.ips.contains(&ip) {
                                candidate.ips.push(ip);
                            }
                        }
                        (candidate, None)
                    }
                    Err(e) => {
                        METRICS.inc_lookups_failed();
                        obs::emit_stage_warning(self.name(), candidate.name(), &e);
                        let warning = StageWarning {
                            host: candidate.name().to_string(),
                            detail: e.to_string(),
                        };
                        (candidate, Some(warning))
                    }
                }
            }
        })
        .await;

        obs::emit_stage_finished(
            self.name(),
            output.candidates.len(),
            output.warnings.len(),
            started.elapsed().as_millis() as u64,
        );
        output
    }
}
