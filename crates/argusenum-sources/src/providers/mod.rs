//! One module per intelligence provider.

pub mod anubis;
pub mod censys;
pub mod certspotter;
pub mod chaos;
pub mod commoncrawl;
pub mod crtsh;
pub mod dnsdumpster;
pub mod otx;
pub mod rapiddns;
pub mod securitytrails;
pub mod shodan;
pub mod virustotal;

pub use anubis::AnubisDb;
pub use censys::{Censys, CensysAuth};
pub use certspotter::CertSpotter;
pub use chaos::Chaos;
pub use commoncrawl::CommonCrawl;
pub use crtsh::CrtSh;
pub use dnsdumpster::DnsDumpster;
pub use otx::AlienVaultOtx;
pub use rapiddns::RapidDns;
pub use securitytrails::SecurityTrails;
pub use shodan::Shodan;
pub use virustotal::VirusTotal;
