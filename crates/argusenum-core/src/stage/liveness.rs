//! Liveness stage: one HTTPS request per candidate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::{Candidate, ConfigError, ProbeError};
use crate::metrics::METRICS;
use crate::obs;
use crate::stage::pool::run_pool;
use crate::stage::{BuiltinStage, Stage, StageOutput, StageWarning};

/// Per-probe budget.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Injectable reachability check. Returns the HTTP status code on any
/// response, whatever its class.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, host: &str) -> Result<u16, ProbeError>;
}

/// reqwest-backed prober issuing `GET {scheme}://{host}/`.
pub struct HttpsProber {
    client: reqwest::Client,
    scheme: String,
}

impl HttpsProber {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("argusenum/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            scheme: "https".to_string(),
        })
    }

    /// Override the URL scheme. Tests point this at a plain-HTTP mock.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }
}

#[async_trait]
impl Prober for HttpsProber {
    async fn probe(&self, host: &str) -> Result<u16, ProbeError> {
        let url = format!("{}://{}/", self.scheme, host);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) if e.is_timeout() => Err(ProbeError::Timeout { url }),
            Err(e) if e.is_connect() => Err(ProbeError::Connect {
                url,
                detail: e.to_string(),
            }),
            Err(e) => Err(ProbeError::Other {
                url,
                detail: e.to_string(),
            }),
        }
    }
}

/// Marks candidates alive and records their status code.
pub struct LivenessStage {
    prober: Arc<dyn Prober>,
    width: usize,
}

impl LivenessStage {
    pub fn new(prober: Arc<dyn Prober>, width: usize) -> Self {
        Self { prober, width }
    }
}

#[async_trait]
impl Stage for LivenessStage {
    fn name(&self) -> &str {
        BuiltinStage::Liveness.name()
    }

    async fn run(&self, candidates: Vec<Candidate>) -> StageOutput {
        let started = Instant::now();
        let output = run_pool(candidates, self.width, |mut candidate| {
            let prober = Arc::clone(&self.prober);
            async move {
                match prober.probe(candidate.name()).await {
                    Ok(status) => {
                        candidate.alive = true;
                        candidate.http_status = Some(status);
                        (candidate, None)
                    }
                    Err(e) => {
                        METRICS.inc_probes_failed();
                        tracing::debug!(stage = "liveness", host = %candidate.name(), error = %e);
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
