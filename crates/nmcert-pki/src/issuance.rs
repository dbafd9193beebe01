//! End-to-end issuance
//!
//! [`issue`] runs the whole pipeline in memory: leaf key, floored validity,
//! dehydrated serial, issuer resolution, signing, the round-trip check for
//! self-signed leaves and the optional false certificate. Nothing touches
//! the filesystem until [`Issuance::artifacts`] is handed to
//! [`crate::output::write_artifacts`].

use nmcert_key::KeyPair;
use serde_json::Value;

use crate::{
    ca::{resolve_issuer, Authority, AuthorityOrigin, IssueContext},
    cert::{
        issue_false_certificate, self_sign_certificate, CertificateTemplate, FalseCertificate,
        IssuedCertificate, Role,
    },
    chain::ChainBundle,
    config::IssueConfig,
    dehydrate::{DehydratedCertificate, DehydratedRecord},
    error::Result,
    tlsa::TlsaRecord,
    verify::verify_round_trip,
};

pub const CERT_FILE: &str = "cert.pem";
pub const KEY_FILE: &str = "key.pem";
pub const CHAIN_FILE: &str = "chain.pem";
pub const CA_CHAIN_FILE: &str = "caChain.pem";
pub const CA_CERT_FILE: &str = "caCert.pem";
pub const CA_KEY_FILE: &str = "caKey.pem";
pub const GRANDPARENT_CERT_FILE: &str = "grandparentCert.pem";
pub const GRANDPARENT_KEY_FILE: &str = "grandparentKey.pem";
pub const NAMECOIN_FILE: &str = "namecoin.json";
pub const FALSE_CERT_FILE: &str = "falseCert.pem";
pub const FALSE_KEY_FILE: &str = "falseKey.pem";

/// Value to publish in the domain's Namecoin `tls` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamecoinRecord {
    /// Compact self-signed leaf
    Dehydrated(DehydratedCertificate),
    /// Trust anchor pin for a minted CA
    Tlsa(TlsaRecord),
}

impl NamecoinRecord {
    pub fn to_json(&self) -> Value {
        match self {
            NamecoinRecord::Dehydrated(dehydrated) => dehydrated.to_namecoin_value(),
            NamecoinRecord::Tlsa(tlsa) => tlsa.to_json(),
        }
    }
}

/// One output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: &'static str,
    pub contents: Vec<u8>,
    /// Private key material; written owner-only
    pub secret: bool,
}

impl Artifact {
    pub fn public(file_name: &'static str, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name,
            contents: contents.into(),
            secret: false,
        }
    }

    pub fn secret(file_name: &'static str, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name,
            contents: contents.into(),
            secret: true,
        }
    }
}

/// Everything produced by one run
#[derive(Debug)]
pub struct Issuance {
    pub hosts: Vec<String>,
    pub leaf: IssuedCertificate,
    pub leaf_key: KeyPair,
    /// Issuer of the leaf; `None` when self-signed
    pub authority: Option<Authority>,
    pub chain: ChainBundle,
    pub namecoin_record: Option<NamecoinRecord>,
    pub false_certificate: Option<FalseCertificate>,
}

/// Issue a leaf certificate and everything around it.
///
/// # Arguments
/// * `config` - validated configuration
///
/// # Returns
/// Returns the in-memory result; a self-signed leaf has already passed the
/// round-trip check
pub fn issue(config: IssueConfig) -> Result<Issuance> {
    let IssueConfig {
        hosts,
        algorithm,
        validity,
        anchor,
        aia_base,
        false_host,
    } = config;
    let primary_host = hosts.first().cloned().unwrap_or_default();

    let leaf_key = KeyPair::generate(algorithm)?;
    let leaf_public = leaf_key.public_key()?;
    let serial_number =
        DehydratedRecord::new(leaf_public.spki_der(), &validity).serial_number(&primary_host)?;
    let template = CertificateTemplate::leaf(&hosts, validity, serial_number)?;

    let context = IssueContext {
        hosts: &hosts,
        algorithm,
        validity,
        aia_base: &aia_base,
    };
    let authority = resolve_issuer(anchor, Role::Ca, &context)?;

    let leaf = match &authority {
        Some(authority) => authority.issue_certificate(&template, leaf_public.spki_der())?,
        None => self_sign_certificate(&template, &leaf_key)?,
    };
    tracing::info!(
        host = %primary_host,
        %algorithm,
        not_before = validity.not_before(),
        not_after = validity.not_after(),
        self_signed = authority.is_none(),
        "issued leaf certificate"
    );

    let namecoin_record = match &authority {
        None => Some(NamecoinRecord::Dehydrated(verify_round_trip(
            &leaf.der,
            &primary_host,
        )?)),
        Some(authority) => authority.tlsa_record()?.map(NamecoinRecord::Tlsa),
    };

    let false_certificate = false_host
        .as_deref()
        .map(|false_host| issue_false_certificate(false_host, algorithm, validity, &leaf, &leaf_key))
        .transpose()?;

    let bundled = authority
        .as_ref()
        .map(|authority| authority.bundle().to_vec())
        .unwrap_or_default();
    let chain = ChainBundle::new(leaf.to_pem()?, bundled);

    Ok(Issuance {
        hosts,
        leaf,
        leaf_key,
        authority,
        chain,
        namecoin_record,
        false_certificate,
    })
}

impl Issuance {
    /// Files to write, in write order.
    ///
    /// Authorities loaded from disk and keys supplied by the operator are
    /// not written back.
    pub fn artifacts(&self) -> Result<Vec<Artifact>> {
        let mut artifacts = vec![
            Artifact::public(CERT_FILE, self.chain.leaf()),
            Artifact::secret(KEY_FILE, self.leaf_key.to_pkcs8_pem()?),
            Artifact::public(CHAIN_FILE, self.chain.full_chain()),
            Artifact::public(CA_CHAIN_FILE, self.chain.ca_chain()),
        ];

        for authority in self.authority.iter().flat_map(Authority::lineage) {
            let AuthorityOrigin::Minted { key_generated, .. } = authority.origin() else {
                continue;
            };
            let (cert_file, key_file) = match authority.role() {
                Role::GrandparentCa => (GRANDPARENT_CERT_FILE, GRANDPARENT_KEY_FILE),
                _ => (CA_CERT_FILE, CA_KEY_FILE),
            };
            artifacts.push(Artifact::public(cert_file, authority.certificate().to_pem()?));
            if key_generated {
                artifacts.push(Artifact::secret(key_file, authority.key().to_pkcs8_pem()?));
            }
        }

        if let Some(record) = &self.namecoin_record {
            let mut json = serde_json::to_string(&record.to_json())?;
            json.push('\n');
            artifacts.push(Artifact::public(NAMECOIN_FILE, json));
        }

        if let Some(false_certificate) = &self.false_certificate {
            artifacts.push(Artifact::public(
                FALSE_CERT_FILE,
                false_certificate.certificate.to_pem()?,
            ));
            artifacts.push(Artifact::secret(
                FALSE_KEY_FILE,
                false_certificate.key.to_pkcs8_pem()?,
            ));
        }

        Ok(artifacts)
    }
}
