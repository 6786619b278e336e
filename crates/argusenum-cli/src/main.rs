//! ArgusEnum - passive subdomain enumeration and enrichment
//!
//! The `argusenum` command queries every configured intelligence provider
//! for each target domain, merges the results, resolves and probes every
//! hostname, tags it, and writes the enriched set as JSON.
//!
//! Provider credentials are read from `ARGUSENUM_*` environment variables;
//! providers without one are skipped.

use std::fmt::Write as _;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{warn, Level};

use argusenum_core::telemetry::init_tracing;
use argusenum_core::{
    cancellation, load_resolvers, Canceller, ConfigError, Engine, RunConfig, RunReport,
    TargetSpec, DEFAULT_OUTPUT, VERSION,
};

#[derive(Parser, Debug)]
#[command(name = "argusenum")]
#[command(author = "ParallaxRoot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Passive subdomain enumeration and enrichment", long_about = None)]
struct Cli {
    /// Single target domain
    #[arg(short, long)]
    domain: Option<String>,

    /// File with one target domain per line
    #[arg(short, long)]
    list: Option<PathBuf>,

    /// Output JSON file (empty string disables export)
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: String,

    /// Passive sources only
    #[arg(long)]
    passive: bool,

    /// Active enumeration only (skips passive sources)
    #[arg(long)]
    active: bool,

    /// File with one DNS resolver per line (IP or IP:PORT)
    #[arg(long)]
    resolvers: Option<PathBuf>,

    /// Concurrent lookups and probes
    #[arg(short, long, default_value_t = argusenum_core::DEFAULT_THREADS)]
    threads: usize,

    /// Per-domain aggregation deadline in seconds (0 waits for every source)
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Comma-separated allow-list of sources (default: all)
    #[arg(long, value_delimiter = ',')]
    sources: Vec<String>,

    /// Skip the environment and exposure tagging
    #[arg(long)]
    no_tags: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Turn parsed flags into a validated run configuration.
    fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let targets = TargetSpec {
            domain: self.domain.clone(),
            list: self.list.clone(),
        };
        let mut config = RunConfig::from_targets(&targets)?;

        config.output = match self.output.trim() {
            "" => None,
            path => Some(PathBuf::from(path)),
        };
        config.passive_only = self.passive;
        config.active_only = self.active;
        if let Some(path) = &self.resolvers {
            config.resolvers = load_resolvers(path)?;
        }
        config.threads = self.threads;
        config.aggregation_timeout = (self.timeout > 0).then(|| Duration::from_secs(self.timeout));
        config.sources = self
            .sources
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        config.correlate = !self.no_tags;

        config.validate()?;
        Ok(config)
    }
}

fn banner() -> String {
    format!("ArgusEnum v{VERSION} :: passive subdomain enumeration")
}

fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    for domain in &report.domains {
        let _ = write!(
            out,
            "{:<32} {:>6} found, {} source(s) failed",
            domain.domain, domain.candidates, domain.failed_sources
        );
        if domain.cancelled {
            out.push_str(" [cancelled]");
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "Total: {} unique, {} resolved, {} alive, {} stage warning(s)",
        report.total,
        report.resolved,
        report.alive,
        report.warning_count()
    );
    match &report.exported_to {
        Some(target) => {
            let _ = writeln!(out, "Results written to {target}");
        }
        None => out.push_str("Results not exported\n"),
    }
    let _ = write!(
        out,
        "Run {} finished in {} ms",
        report.run_id, report.duration_ms
    );
    out
}

/// Exit status after a forced abort (128 + SIGINT).
const ABORT_EXIT_CODE: i32 = 130;

/// The first interrupt cancels the run so partial results still get
/// enriched and written; a second one asks for an immediate abort.
/// Returns `true` when the caller should abort.
async fn handle_interrupts<F, Fut>(mut next_interrupt: F, canceller: Canceller) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("interrupt received; finishing with partial results (interrupt again to abort)");
    canceller.cancel();

    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("second interrupt received; aborting");
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);
    eprintln!("{}", banner());

    let config = cli.run_config().context("invalid configuration")?;
    let sources =
        argusenum_sources::select(&config.sources).context("invalid source selection")?;
    let engine = Engine::build(config, sources).context("failed to set up the pipeline")?;

    let (canceller, signal) = cancellation();
    let interrupt = tokio::spawn(async move {
        if handle_interrupts(tokio::signal::ctrl_c, canceller).await {
            std::process::exit(ABORT_EXIT_CODE);
        }
    });

    let outcome = engine.run(&signal).await;
    interrupt.abort();
    let report = outcome.context("run failed")?;

    println!("{}", render_summary(&report));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use argusenum_core::{DomainReport, StageReport};
    use std::io::Write;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["argusenum"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["-d", "example.com"]);
        assert_eq!(cli.output, "results.json");
        assert_eq!(cli.threads, 64);
        assert_eq!(cli.timeout, 300);
        assert!(cli.sources.is_empty());

        let config = cli.run_config().unwrap();
        assert_eq!(config.domains, vec!["example.com"]);
        assert_eq!(config.aggregation_timeout, Some(Duration::from_secs(300)));
        assert!(config.correlate);
    }

    #[test]
    fn test_flags_map_onto_config() {
        let cli = parse(&[
            "-d",
            "Example.COM",
            "-o",
            "",
            "--passive",
            "-t",
            "8",
            "--timeout",
            "0",
            "--sources",
            "crt.sh, otx,",
            "--no-tags",
        ]);
        let config = cli.run_config().unwrap();
        assert_eq!(config.domains, vec!["example.com"]);
        assert!(config.output.is_none());
        assert!(config.passive_only);
        assert_eq!(config.threads, 8);
        assert!(config.aggregation_timeout.is_none());
        assert_eq!(config.sources, vec!["crt.sh", "otx"]);
        assert!(!config.correlate);
    }

    #[test]
    fn test_conflicting_flags_are_config_errors() {
        let both = parse(&["-d", "example.com", "-l", "domains.txt"]);
        assert!(matches!(
            both.run_config(),
            Err(ConfigError::ConflictingTargets)
        ));

        let neither = parse(&[]);
        assert!(matches!(neither.run_config(), Err(ConfigError::NoDomains)));

        let modes = parse(&["-d", "example.com", "--passive", "--active"]);
        assert!(matches!(
            modes.run_config(),
            Err(ConfigError::ConflictingModes)
        ));

        let threads = parse(&["-d", "example.com", "-t", "0"]);
        assert!(matches!(
            threads.run_config(),
            Err(ConfigError::InvalidThreads)
        ));
    }

    #[test]
    fn test_list_and_resolvers_files() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("domains.txt");
        std::fs::write(&list, "example.com\nexample.org\n").unwrap();
        let mut resolvers = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
        writeln!(resolvers, "1.1.1.1\n9.9.9.9:53").unwrap();

        let cli = parse(&[
            "-l",
            list.to_str().unwrap(),
            "--resolvers",
            resolvers.path().to_str().unwrap(),
        ]);
        let config = cli.run_config().unwrap();
        assert_eq!(config.domains, vec!["example.com", "example.org"]);
        assert_eq!(config.resolvers.len(), 2);
    }

    #[test]
    fn test_bad_thread_count_rejected_by_clap() {
        assert!(Cli::try_parse_from(["argusenum", "-d", "example.com", "-t", "many"]).is_err());
    }

    #[test]
    fn test_render_summary() {
        let report = RunReport {
            run_id: "run-1".to_string(),
            domains: vec![DomainReport {
                domain: "example.com".to_string(),
                candidates: 12,
                failed_sources: 2,
                error: None,
                cancelled: true,
            }],
            stages: vec![StageReport {
                stage: "resolution".to_string(),
                warnings: Vec::new(),
                duration_ms: 3,
                discarded: false,
            }],
            total: 12,
            resolved: 9,
            alive: 4,
            exported_to: Some("results.json".to_string()),
            duration_ms: 1500,
        };
        let text = render_summary(&report);
        assert!(text.contains("example.com"));
        assert!(text.contains("12 found, 2 source(s) failed [cancelled]"));
        assert!(text.contains("Total: 12 unique, 9 resolved, 4 alive, 0 stage warning(s)"));
        assert!(text.contains("Results written to results.json"));
        assert!(banner().contains(VERSION));
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels_second_aborts() {
        let interrupts = Arc::new(Notify::new());
        let (canceller, signal) = cancellation();
        let source = Arc::clone(&interrupts);
        let handler = tokio::spawn(handle_interrupts(
            move || {
                let source = Arc::clone(&source);
                async move {
                    source.notified().await;
                    Ok(())
                }
            },
            canceller,
        ));

        interrupts.notify_one();
        tokio::time::timeout(Duration::from_secs(5), signal.cancelled())
            .await
            .unwrap();
        assert!(!handler.is_finished());

        interrupts.notify_one();
        let abort = tokio::time::timeout(Duration::from_secs(5), handler)
            .await
            .unwrap()
            .unwrap();
        assert!(abort);
    }

    #[tokio::test]
    async fn test_unavailable_signal_never_aborts() {
        let (canceller, signal) = cancellation();
        let abort = handle_interrupts(
            || async { Err(std::io::Error::other("no signal handler")) },
            canceller,
        )
        .await;
        assert!(!abort);
        assert!(!signal.is_cancelled());
    }
}
