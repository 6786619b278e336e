//! ArgusEnum Sources
//!
//! Passive intelligence provider adapters implementing
//! [`argusenum_core::SubdomainSource`], plus the registry that builds them
//! from environment credentials.
//!
//! Every adapter owns its HTTP client and time budget, returns an empty
//! list when its required credential is missing, and reports failures as
//! [`argusenum_core::SourceError`] without retrying.

use std::sync::Arc;

use argusenum_core::{ConfigError, SubdomainSource};

pub mod http;
pub mod providers;

pub use providers::{
    AlienVaultOtx, AnubisDb, Censys, CensysAuth, CertSpotter, Chaos, CommonCrawl, CrtSh,
    DnsDumpster, RapidDns, SecurityTrails, Shodan, VirusTotal,
};

/// Every adapter name, in registry order.
pub const KNOWN: &[&str] = &[
    providers::crtsh::NAME,
    providers::certspotter::NAME,
    providers::censys::NAME,
    providers::virustotal::NAME,
    providers::securitytrails::NAME,
    providers::otx::NAME,
    providers::shodan::NAME,
    providers::chaos::NAME,
    providers::anubis::NAME,
    providers::rapiddns::NAME,
    providers::dnsdumpster::NAME,
    providers::commoncrawl::NAME,
];

fn unknown(name: &str) -> ConfigError {
    ConfigError::UnknownSource {
        name: name.to_string(),
        known: KNOWN.join(", "),
    }
}

/// Build one adapter by name, reading its credential from the environment.
/// Accepts the aliases `crtsh` and `otx`.
pub fn from_env(name: &str) -> Result<Arc<dyn SubdomainSource>, ConfigError> {
    let source: Arc<dyn SubdomainSource> = match name.trim().to_ascii_lowercase().as_str() {
        "crt.sh" | "crtsh" => Arc::new(CrtSh::new()?),
        "certspotter" => Arc::new(CertSpotter::from_env()?),
        "censys" => Arc::new(Censys::from_env()?),
        "virustotal" => Arc::new(VirusTotal::from_env()?),
        "securitytrails" => Arc::new(SecurityTrails::from_env()?),
        "alienvault_otx" | "otx" => Arc::new(AlienVaultOtx::from_env()?),
        "shodan" => Arc::new(Shodan::from_env()?),
        "chaos" => Arc::new(Chaos::from_env()?),
        "anubisdb" => Arc::new(AnubisDb::new()?),
        "rapiddns" => Arc::new(RapidDns::new()?),
        "dnsdumpster" => Arc::new(DnsDumpster::from_env()?),
        "commoncrawl" => Arc::new(CommonCrawl::new()?),
        _ => return Err(unknown(name)),
    };
    Ok(source)
}

/// Every adapter, in registry order.
pub fn all_from_env() -> Result<Vec<Arc<dyn SubdomainSource>>, ConfigError> {
    KNOWN.iter().map(|name| from_env(name)).collect()
}

/// Adapters named in `names`, in the order given; duplicates are ignored.
/// An empty allow-list selects every adapter.
pub fn select<S: AsRef<str>>(names: &[S]) -> Result<Vec<Arc<dyn SubdomainSource>>, ConfigError> {
    if names.is_empty() {
        return all_from_env();
    }

    let mut selected: Vec<Arc<dyn SubdomainSource>> = Vec::new();
    for name in names {
        let source = from_env(name.as_ref())?;
        if !selected.iter().any(|s| s.name() == source.name()) {
            selected.push(source);
        }
    }
    Ok(selected)
}
