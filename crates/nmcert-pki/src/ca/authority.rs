//! Certificate authorities above the leaf
//!
//! An [`AnchorStrategy`] says how the issuer of a certificate is obtained:
//! none (self-signed), loaded from disk, or minted in this run and itself
//! anchored by a nested strategy. [`resolve_issuer`] walks that structure
//! recursively, so the CA and grandparent CA share one code path and differ
//! only in their [`Role`].

use std::{fs, path::Path};

use der::Encode;
use nmcert_key::{Algorithm, KeyPair};
use x509_cert::Certificate;

use super::aia::issuing_certificate_urls;
use crate::{
    cert::{
        parse_first_certificate, random_serial_number, self_sign_certificate, sign_certificate,
        CertificateTemplate, IssuedCertificate, Role,
    },
    error::{PkiError, Result},
    tlsa::TlsaRecord,
    validity::ValidityWindow,
};

/// Authority key and chain loaded from PEM files
#[derive(Debug)]
pub struct ExistingAuthority {
    /// Private key matching the first certificate of the chain
    pub key: KeyPair,
    /// First certificate of the chain; the signer
    pub certificate: Certificate,
    /// Chain file contents, bundled verbatim
    pub chain_pem: String,
}

impl ExistingAuthority {
    /// Read a PKCS#8 key file and a PEM chain file
    pub fn load(key_path: &Path, chain_path: &Path) -> Result<Self> {
        let key_pem =
            fs::read_to_string(key_path).map_err(|e| PkiError::io(key_path, e))?;
        let chain_pem =
            fs::read_to_string(chain_path).map_err(|e| PkiError::io(chain_path, e))?;

        let authority = Self::from_pem(&key_pem, chain_pem)?;
        tracing::info!(
            key = %key_path.display(),
            chain = %chain_path.display(),
            algorithm = %authority.key.algorithm(),
            "loaded existing authority"
        );
        Ok(authority)
    }

    /// Parse key and chain PEM, rejecting a key that does not match the
    /// chain's first certificate
    pub fn from_pem(key_pem: &str, chain_pem: String) -> Result<Self> {
        let key = KeyPair::from_pkcs8_pem(key_pem)?;
        let certificate = parse_first_certificate(&chain_pem)?;

        let cert_spki = certificate.tbs_certificate.subject_public_key_info.to_der()?;
        if key.public_key()?.spki_der() != cert_spki.as_slice() {
            return Err(PkiError::ConfigError(
                "authority key and certificate do not match".to_string(),
            ));
        }

        Ok(Self {
            key,
            certificate,
            chain_pem,
        })
    }
}

/// Where the private key of a minted authority comes from
#[derive(Debug)]
pub enum KeySource {
    /// Fresh key of the run's algorithm
    Generate,
    /// Key loaded from disk; not written back out
    Existing(KeyPair),
}

/// How the issuer of a certificate is obtained
#[derive(Debug)]
pub enum AnchorStrategy {
    /// No issuer; the certificate signs itself
    SelfSigned,
    /// Issuer key and chain supplied on disk
    Existing(ExistingAuthority),
    /// Issuer minted in this run
    Minted {
        key: KeySource,
        /// How the minted authority itself is anchored
        anchor: Box<AnchorStrategy>,
        /// Point at the anchor through AIA instead of bundling it
        aia: bool,
    },
}

impl AnchorStrategy {
    /// Nesting depth of minted authorities
    pub fn depth(&self) -> usize {
        match self {
            AnchorStrategy::SelfSigned | AnchorStrategy::Existing(_) => 0,
            AnchorStrategy::Minted { anchor, .. } => 1 + anchor.depth(),
        }
    }
}

/// Run-wide inputs shared by every authority
#[derive(Debug, Clone, Copy)]
pub struct IssueContext<'a> {
    pub hosts: &'a [String],
    pub algorithm: Algorithm,
    pub validity: ValidityWindow,
    pub aia_base: &'a str,
}

/// How an authority came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityOrigin {
    /// Loaded from disk
    Existing,
    /// Minted in this run
    Minted {
        key_generated: bool,
        aia: bool,
    },
}

/// Certificate authority able to sign certificates below it
#[derive(Debug)]
pub struct Authority {
    role: Role,
    key: KeyPair,
    certificate: IssuedCertificate,
    origin: AuthorityOrigin,
    /// PEM blocks bundled after a certificate this authority signs
    bundle: Vec<String>,
    parent: Option<Box<Authority>>,
}

impl Authority {
    /// Wrap on-disk material
    pub fn from_existing(existing: ExistingAuthority, role: Role) -> Result<Self> {
        let ExistingAuthority {
            key,
            certificate,
            chain_pem,
        } = existing;

        Ok(Self {
            role,
            key,
            certificate: IssuedCertificate::new(certificate)?,
            origin: AuthorityOrigin::Existing,
            bundle: vec![chain_pem],
            parent: None,
        })
    }

    /// Mint an authority certificate for `role`, anchored by `anchor`.
    ///
    /// # Arguments
    /// * `role` - `Role::Ca` or `Role::GrandparentCa`
    /// * `key` - where the authority's key comes from
    /// * `anchor` - how the authority's own issuer is obtained
    /// * `aia` - reference the issuer through AIA instead of bundling it
    /// * `context` - hosts, algorithm, validity and AIA base of the run
    pub fn mint(
        role: Role,
        key: KeySource,
        anchor: AnchorStrategy,
        aia: bool,
        context: &IssueContext<'_>,
    ) -> Result<Self> {
        let (key, key_generated) = match key {
            KeySource::Generate => (KeyPair::generate(context.algorithm)?, true),
            KeySource::Existing(key) => {
                tracing::info!(role = role.label(), "using existing private key");
                (key, false)
            }
        };

        let parent = resolve_issuer(anchor, role.issuer_role(), context)?;

        let mut template = CertificateTemplate::authority(
            role,
            context.hosts,
            context.validity,
            random_serial_number()?,
        )?;
        if aia {
            let parent = parent.as_ref().ok_or_else(|| {
                PkiError::ConfigError(format!(
                    "AIA on the {} requires an issuing authority",
                    role.label()
                ))
            })?;
            let parent_spki = parent.key.public_key()?;
            template = template.with_issuing_certificate_urls(issuing_certificate_urls(
                context.aia_base,
                context.hosts,
                parent_spki.spki_der(),
            ))?;
        }

        let public_key = key.public_key()?;
        let certificate = match &parent {
            Some(parent) => parent.issue_certificate(&template, public_key.spki_der())?,
            None => self_sign_certificate(&template, &key)?,
        };
        tracing::info!(
            role = role.label(),
            algorithm = %key.algorithm(),
            self_signed = parent.is_none(),
            aia,
            "minted authority certificate"
        );

        // A self-signed authority is pinned out of band, not bundled. With
        // AIA the validator fetches the parent instead of finding it inline.
        let mut bundle = Vec::new();
        if parent.is_some() {
            bundle.push(certificate.to_pem()?);
        }
        if let (Some(parent), false) = (&parent, aia) {
            bundle.extend(parent.bundle.iter().cloned());
        }

        Ok(Self {
            role,
            key,
            certificate,
            origin: AuthorityOrigin::Minted { key_generated, aia },
            bundle,
            parent: parent.map(Box::new),
        })
    }

    /// Sign a template for a subject key
    pub fn issue_certificate(
        &self,
        template: &CertificateTemplate,
        spki_der: &[u8],
    ) -> Result<IssuedCertificate> {
        sign_certificate(template, spki_der, &self.certificate.issuer_ref()?, &self.key)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn certificate(&self) -> &IssuedCertificate {
        &self.certificate
    }

    pub fn origin(&self) -> AuthorityOrigin {
        self.origin
    }

    pub fn parent(&self) -> Option<&Authority> {
        self.parent.as_deref()
    }

    /// PEM blocks to place after a certificate this authority signs
    pub fn bundle(&self) -> &[String] {
        &self.bundle
    }

    /// This authority followed by its ancestors
    pub fn lineage(&self) -> impl Iterator<Item = &Authority> {
        std::iter::successors(Some(self), |authority| authority.parent())
    }

    /// DANE-TA pin for an authority minted here without AIA
    pub fn tlsa_record(&self) -> Result<Option<TlsaRecord>> {
        match self.origin {
            AuthorityOrigin::Minted { aia: false, .. } => Ok(Some(TlsaRecord::from_key(&self.key)?)),
            _ => Ok(None),
        }
    }
}

/// Obtain the issuer for a certificate according to `strategy`.
///
/// Returns `None` for self-signed. `role` is the role the issuer plays.
pub fn resolve_issuer(
    strategy: AnchorStrategy,
    role: Role,
    context: &IssueContext<'_>,
) -> Result<Option<Authority>> {
    match strategy {
        AnchorStrategy::SelfSigned => Ok(None),
        AnchorStrategy::Existing(existing) => Authority::from_existing(existing, role).map(Some),
        AnchorStrategy::Minted { key, anchor, aia } => {
            Authority::mint(role, key, *anchor, aia, context).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ca::aia::DEFAULT_AIA_BASE,
        cert::{key_identifier, subject_key_identifier, verify_signature},
    };

    fn hosts() -> Vec<String> {
        vec!["a.bit".to_string(), "b.bit".to_string()]
    }

    fn context(hosts: &[String]) -> IssueContext<'_> {
        IssueContext {
            hosts,
            algorithm: Algorithm::P256,
            validity: ValidityWindow::floored(1_700_000_000, 365 * 86_400).unwrap(),
            aia_base: DEFAULT_AIA_BASE,
        }
    }

    fn existing_root(hosts: &[String]) -> ExistingAuthority {
        let key = KeyPair::generate(Algorithm::P384).unwrap();
        let template = CertificateTemplate::authority(
            Role::GrandparentCa,
            hosts,
            ValidityWindow::floored(1_700_000_000, 86_400).unwrap(),
            vec![1],
        )
        .unwrap();
        let certificate = self_sign_certificate(&template, &key).unwrap();
        ExistingAuthority::from_pem(&key.to_pkcs8_pem().unwrap(), certificate.to_pem().unwrap())
            .unwrap()
    }

    #[test]
    fn test_self_signed_resolves_to_none() {
        let hosts = hosts();
        let issuer = resolve_issuer(AnchorStrategy::SelfSigned, Role::Ca, &context(&hosts)).unwrap();
        assert!(issuer.is_none());
    }

    #[test]
    fn test_minted_self_signed_ca_is_pinned_not_bundled() {
        let hosts = hosts();
        let strategy = AnchorStrategy::Minted {
            key: KeySource::Generate,
            anchor: Box::new(AnchorStrategy::SelfSigned),
            aia: false,
        };
        let ca = resolve_issuer(strategy, Role::Ca, &context(&hosts)).unwrap().unwrap();

        assert!(ca.bundle().is_empty());
        assert!(ca.parent().is_none());
        assert!(ca.tlsa_record().unwrap().is_some());
        assert_eq!(
            ca.origin(),
            AuthorityOrigin::Minted {
                key_generated: true,
                aia: false
            }
        );
        let tbs = &ca.certificate().certificate.tbs_certificate;
        assert_eq!(tbs.issuer, tbs.subject);
    }

    #[test]
    fn test_aia_ca_under_minted_grandparent() {
        let hosts = hosts();
        let strategy = AnchorStrategy::Minted {
            key: KeySource::Generate,
            anchor: Box::new(AnchorStrategy::Minted {
                key: KeySource::Generate,
                anchor: Box::new(AnchorStrategy::SelfSigned),
                aia: false,
            }),
            aia: true,
        };
        assert_eq!(strategy.depth(), 2);

        let ca = resolve_issuer(strategy, Role::Ca, &context(&hosts)).unwrap().unwrap();
        let grandparent = ca.parent().unwrap();
        assert_eq!(grandparent.role(), Role::GrandparentCa);
        assert_eq!(ca.lineage().count(), 2);

        // only the CA itself is bundled; its issuer is found through AIA
        assert_eq!(ca.bundle().len(), 1);
        assert!(ca.tlsa_record().unwrap().is_none());

        verify_signature(
            &ca.certificate().certificate,
            grandparent.key().public_key().unwrap().spki_der(),
        )
        .unwrap();

        let grandparent_cert = &grandparent.certificate().certificate;
        let ski = subject_key_identifier(grandparent_cert).unwrap().unwrap();
        assert_eq!(
            ski,
            key_identifier(&grandparent_cert.tbs_certificate.subject_public_key_info)
        );
    }

    #[test]
    fn test_minted_ca_bundles_existing_grandparent() {
        let hosts = hosts();
        let root = existing_root(&hosts);
        let root_chain = root.chain_pem.clone();
        let strategy = AnchorStrategy::Minted {
            key: KeySource::Generate,
            anchor: Box::new(AnchorStrategy::Existing(root)),
            aia: false,
        };

        let ca = resolve_issuer(strategy, Role::Ca, &context(&hosts)).unwrap().unwrap();
        assert_eq!(ca.bundle().len(), 2);
        assert_eq!(ca.bundle()[1], root_chain);
        assert_eq!(ca.parent().unwrap().origin(), AuthorityOrigin::Existing);
    }

    #[test]
    fn test_existing_key_mismatch_rejected() {
        let hosts = hosts();
        let root = existing_root(&hosts);
        let other = KeyPair::generate(Algorithm::P384).unwrap();
        let err = ExistingAuthority::from_pem(&other.to_pkcs8_pem().unwrap(), root.chain_pem)
            .unwrap_err();
        assert!(err.to_string().contains("do not match"));
    }

    #[test]
    fn test_existing_key_reused_for_minted_ca() {
        let hosts = hosts();
        let key = KeyPair::generate(Algorithm::Ed25519).unwrap();
        let spki = key.public_key().unwrap();
        let strategy = AnchorStrategy::Minted {
            key: KeySource::Existing(key),
            anchor: Box::new(AnchorStrategy::SelfSigned),
            aia: false,
        };

        let ca = resolve_issuer(strategy, Role::Ca, &context(&hosts)).unwrap().unwrap();
        assert_eq!(ca.key().public_key().unwrap(), spki);
        assert!(matches!(
            ca.origin(),
            AuthorityOrigin::Minted {
                key_generated: false,
                ..
            }
        ));
    }
}
