//! Subscriber setup for the `argusenum` binary.
//!
//! Log lines go to stderr; stdout carries only the run summary.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Crates whose events follow the requested verbosity. Everything else
/// (resolver and HTTP internals) stays at `warn`.
const OWN_TARGETS: &[&str] = &["argusenum", "argusenum_core", "argusenum_sources"];

/// Directive string used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    std::iter::once("warn".to_string())
        .chain(OWN_TARGETS.iter().map(|t| format!("{t}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. `RUST_LOG` overrides `level`; `json`
/// switches to newline-delimited JSON. Later calls are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let format = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let format = if json {
        format.json().boxed()
    } else {
        format.compact().boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(format.with_filter(filter))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_scope_verbosity_to_own_crates() {
        let directives = default_directives(Level::DEBUG);
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("argusenum_core=debug"));
        assert!(directives.contains("argusenum_sources=debug"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_init_tracing_is_repeatable() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
