//! Issuance configuration
//!
//! [`IssueOptions`] mirrors the command line. [`IssueConfig::from_options`]
//! validates it once and produces the explicit configuration threaded
//! through the pipeline. Every flag combination is checked before any file
//! is read or key generated.

use std::{fs, path::PathBuf};

use nmcert_key::{Algorithm, KeyPair};
use serde::{Deserialize, Serialize};

use crate::{
    ca::{AnchorStrategy, ExistingAuthority, KeySource, DEFAULT_AIA_BASE},
    error::{PkiError, Result},
    validity::ValidityWindow,
};

/// Default validity: 365 days
pub const DEFAULT_DURATION_SECS: i64 = 365 * 24 * 60 * 60;

/// Raw issuance options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueOptions {
    /// Comma-separated hostnames
    pub hosts: String,
    /// ECDSA curve name (P224, P256, P384, P521)
    pub ecdsa_curve: Option<String>,
    /// Use Ed25519 keys
    pub ed25519: bool,
    /// Validity start as Unix seconds; defaults to now
    pub start: Option<i64>,
    /// Validity duration in seconds
    pub duration_secs: i64,
    /// Issue the leaf from a CA instead of self-signing it
    pub use_ca: bool,
    /// Existing CA private key
    pub parent_key: Option<PathBuf>,
    /// Existing CA chain; requires `parent_key`
    pub parent_chain: Option<PathBuf>,
    /// Existing grandparent CA private key
    pub grandparent_key: Option<PathBuf>,
    /// Existing grandparent CA chain, bundled inline
    pub grandparent_chain: Option<PathBuf>,
    /// Reference the grandparent through AIA
    pub use_aia: bool,
    /// AIA resolver host and path
    pub aia_base: String,
    /// Also issue a false certificate for this host
    pub false_host: Option<String>,
}

impl Default for IssueOptions {
    fn default() -> Self {
        Self {
            hosts: String::new(),
            ecdsa_curve: None,
            ed25519: false,
            start: None,
            duration_secs: DEFAULT_DURATION_SECS,
            use_ca: false,
            parent_key: None,
            parent_chain: None,
            grandparent_key: None,
            grandparent_chain: None,
            use_aia: false,
            aia_base: DEFAULT_AIA_BASE.to_string(),
            false_host: None,
        }
    }
}

impl IssueOptions {
    /// Options for a single host with the given algorithm
    pub fn new(hosts: &str, algorithm: Algorithm) -> Self {
        let mut options = Self {
            hosts: hosts.to_string(),
            ..Default::default()
        };
        match algorithm {
            Algorithm::Ed25519 => options.ed25519 = true,
            curve => options.ecdsa_curve = Some(curve.name().to_string()),
        }
        options
    }

    /// Issue from a freshly minted CA
    pub fn with_ca(mut self) -> Self {
        self.use_ca = true;
        self
    }

    /// Reference the grandparent through AIA
    pub fn with_aia(mut self) -> Self {
        self.use_aia = true;
        self
    }
}

/// Validated configuration for one run
#[derive(Debug)]
pub struct IssueConfig {
    /// Hostnames; the first is the primary
    pub hosts: Vec<String>,
    pub algorithm: Algorithm,
    pub validity: ValidityWindow,
    /// How the leaf's issuer is obtained
    pub anchor: AnchorStrategy,
    pub aia_base: String,
    pub false_host: Option<String>,
}

impl IssueConfig {
    /// Validate options and load on-disk material.
    ///
    /// # Arguments
    /// * `options` - raw options
    /// * `now` - current Unix time, used when no start is given
    pub fn from_options(options: IssueOptions, now: i64) -> Result<Self> {
        let hosts = parse_hosts(&options.hosts)?;
        let algorithm = Algorithm::select(options.ecdsa_curve.as_deref(), options.ed25519)
            .map_err(|e| PkiError::ConfigError(e.to_string()))?;
        validate_combination(&options, &hosts)?;
        let validity = ValidityWindow::floored(options.start.unwrap_or(now), options.duration_secs)?;

        let anchor = anchor_strategy(&options)?;
        tracing::debug!(
            hosts = %hosts.join(","),
            %algorithm,
            depth = anchor.depth(),
            "validated issuance options"
        );

        Ok(Self {
            hosts,
            algorithm,
            validity,
            anchor,
            aia_base: options.aia_base,
            false_host: options.false_host.filter(|host| !host.is_empty()),
        })
    }

    pub fn primary_host(&self) -> &str {
        self.hosts.first().map(String::as_str).unwrap_or_default()
    }
}

/// Split a comma-separated host list, dropping empty entries
///
/// Hosts become IA5String SANs, so anything outside ASCII is rejected.
pub fn parse_hosts(hosts: &str) -> Result<Vec<String>> {
    let hosts: Vec<String> = hosts
        .split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect();

    if hosts.is_empty() {
        return Err(PkiError::MissingHostname);
    }
    if let Some(host) = hosts.iter().find(|host| !host.is_ascii()) {
        return Err(PkiError::ConfigError(format!(
            "hostname {host:?} is not ASCII, use its punycode form"
        )));
    }
    Ok(hosts)
}

fn validate_combination(options: &IssueOptions, hosts: &[String]) -> Result<()> {
    let reject = |message: &str| Err(PkiError::ConfigError(message.to_string()));

    if !options.use_ca {
        if options.use_aia {
            return reject("AIA requires CA mode");
        }
        if options.parent_key.is_some() || options.parent_chain.is_some() {
            return reject("parent key or chain requires CA mode");
        }
        if options.grandparent_key.is_some() || options.grandparent_chain.is_some() {
            return reject("grandparent key or chain requires CA mode");
        }
        if hosts.len() > 1 {
            return reject(
                "self-signed certificates support a single hostname; use CA mode for several",
            );
        }
        return Ok(());
    }

    if options.parent_chain.is_some() {
        if options.parent_key.is_none() {
            return reject("parent chain requires a parent key");
        }
        if options.use_aia
            || options.grandparent_key.is_some()
            || options.grandparent_chain.is_some()
        {
            return reject("an existing parent chain cannot be combined with AIA or grandparent options");
        }
    }

    if options.use_aia && options.grandparent_chain.is_some() {
        return reject("AIA and an inline grandparent chain are mutually exclusive");
    }
    if options.grandparent_chain.is_some() && options.grandparent_key.is_none() {
        return reject("grandparent chain requires a grandparent key");
    }
    if options.grandparent_key.is_some() && options.grandparent_chain.is_none() && !options.use_aia
    {
        return reject("grandparent key without a grandparent chain requires AIA");
    }

    Ok(())
}

fn anchor_strategy(options: &IssueOptions) -> Result<AnchorStrategy> {
    if !options.use_ca {
        return Ok(AnchorStrategy::SelfSigned);
    }

    if let (Some(key), Some(chain)) = (&options.parent_key, &options.parent_chain) {
        return Ok(AnchorStrategy::Existing(ExistingAuthority::load(key, chain)?));
    }

    let grandparent = match (&options.grandparent_key, &options.grandparent_chain) {
        (Some(key), Some(chain)) => AnchorStrategy::Existing(ExistingAuthority::load(key, chain)?),
        (key, None) if options.use_aia => AnchorStrategy::Minted {
            key: key_source(key.as_ref())?,
            anchor: Box::new(AnchorStrategy::SelfSigned),
            aia: false,
        },
        _ => AnchorStrategy::SelfSigned,
    };

    Ok(AnchorStrategy::Minted {
        key: key_source(options.parent_key.as_ref())?,
        anchor: Box::new(grandparent),
        aia: options.use_aia,
    })
}

fn key_source(path: Option<&PathBuf>) -> Result<KeySource> {
    let Some(path) = path else {
        return Ok(KeySource::Generate);
    };

    let pem = fs::read_to_string(path).map_err(|e| PkiError::io(path, e))?;
    let key = KeyPair::from_pkcs8_pem(&pem)?;
    tracing::info!(path = %path.display(), algorithm = %key.algorithm(), "loaded private key");
    Ok(KeySource::Existing(key))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::error::ErrorClass;

    const NOW: i64 = 1_700_000_123;

    fn reject(options: IssueOptions) -> PkiError {
        IssueConfig::from_options(options, NOW).unwrap_err()
    }

    fn missing(name: &str) -> Option<PathBuf> {
        Some(Path::new("/nonexistent/nmcert").join(name))
    }

    #[test]
    fn test_parse_hosts() {
        assert_eq!(parse_hosts("a.bit, b.bit,").unwrap(), vec!["a.bit", "b.bit"]);
        assert!(matches!(parse_hosts(""), Err(PkiError::MissingHostname)));
        assert!(matches!(parse_hosts(" , "), Err(PkiError::MissingHostname)));
    }

    #[test]
    fn test_non_ascii_host_rejected() {
        let err = parse_hosts("example.bit, caf\u{e9}.bit").unwrap_err();
        assert_eq!(err.class(), ErrorClass::Configuration);
        assert!(err.to_string().contains("not ASCII"));

        let options = IssueOptions::new("\u{4f8b}\u{5b50}.bit", Algorithm::P256);
        assert_eq!(reject(options).class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_self_signed_defaults() {
        let config =
            IssueConfig::from_options(IssueOptions::new("example.bit", Algorithm::P256), NOW)
                .unwrap();
        assert_eq!(config.primary_host(), "example.bit");
        assert_eq!(config.algorithm, Algorithm::P256);
        assert!(matches!(config.anchor, AnchorStrategy::SelfSigned));
        assert_eq!(config.validity.not_before(), 1_700_000_100);
        assert!(config.false_host.is_none());
    }

    #[test]
    fn test_missing_algorithm() {
        let options = IssueOptions {
            hosts: "example.bit".to_string(),
            ..Default::default()
        };
        let err = reject(options);
        assert_eq!(err.class(), ErrorClass::Configuration);
        assert!(err.to_string().contains("No key algorithm selected"));
    }

    #[test]
    fn test_aia_without_ca_rejected() {
        let options = IssueOptions::new("example.bit", Algorithm::P256).with_aia();
        assert_eq!(reject(options).class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_multiple_hosts_require_ca() {
        let options = IssueOptions::new("a.bit,b.bit", Algorithm::P256);
        assert_eq!(reject(options).class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_aia_with_grandparent_chain_rejected_before_io() {
        // the paths do not exist, so a Configuration error proves no file was read
        let options = IssueOptions {
            grandparent_key: missing("gk.pem"),
            grandparent_chain: missing("gc.pem"),
            ..IssueOptions::new("example.bit", Algorithm::P256).with_ca().with_aia()
        };
        let err = reject(options);
        assert_eq!(err.class(), ErrorClass::Configuration);
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_parent_chain_combinations() {
        let without_key = IssueOptions {
            parent_chain: missing("pc.pem"),
            ..IssueOptions::new("example.bit", Algorithm::P256).with_ca()
        };
        assert_eq!(reject(without_key).class(), ErrorClass::Configuration);

        let with_aia = IssueOptions {
            parent_key: missing("pk.pem"),
            parent_chain: missing("pc.pem"),
            ..IssueOptions::new("example.bit", Algorithm::P256).with_ca().with_aia()
        };
        assert_eq!(reject(with_aia).class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_grandparent_key_alone_requires_aia() {
        let options = IssueOptions {
            grandparent_key: missing("gk.pem"),
            ..IssueOptions::new("example.bit", Algorithm::P256).with_ca()
        };
        assert_eq!(reject(options).class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_missing_key_file_is_io_error() {
        let options = IssueOptions {
            parent_key: missing("pk.pem"),
            ..IssueOptions::new("example.bit", Algorithm::P256).with_ca()
        };
        assert_eq!(reject(options).class(), ErrorClass::Io);
    }

    #[test]
    fn test_aia_mints_grandparent() {
        let options = IssueOptions::new("a.bit,b.bit", Algorithm::Ed25519)
            .with_ca()
            .with_aia();
        let config = IssueConfig::from_options(options, NOW).unwrap();
        assert_eq!(config.anchor.depth(), 2);
        match config.anchor {
            AnchorStrategy::Minted { aia, anchor, .. } => {
                assert!(aia);
                assert!(matches!(*anchor, AnchorStrategy::Minted { aia: false, .. }));
            }
            other => panic!("unexpected anchor {other:?}"),
        }
    }

    #[test]
    fn test_degenerate_duration_rejected() {
        let options = IssueOptions {
            duration_secs: 60,
            start: Some(1_700_000_100),
            ..IssueOptions::new("example.bit", Algorithm::P256)
        };
        assert_eq!(reject(options).class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_duration_past_year_9999_rejected() {
        let options = IssueOptions {
            duration_secs: 9_000 * 365 * 24 * 3600,
            ..IssueOptions::new("example.bit", Algorithm::P256)
        };
        assert_eq!(reject(options).class(), ErrorClass::Configuration);
    }
}
