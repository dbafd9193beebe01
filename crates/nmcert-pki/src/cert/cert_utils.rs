use der::{asn1::BitString, Decode, Encode};
use nmcert_key::{KeyPair, PublicKey, SignatureAlgorithm};
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::{Certificate, TbsCertificate};

use super::{
    template::CertificateTemplate,
    types::{IssuedCertificate, IssuerRef},
};
use crate::error::{PkiError, Result};

/// Length of random authority serial numbers (128 bits)
pub const RANDOM_SERIAL_LEN: usize = 16;

/// Build the unsigned certificate body for a template.
///
/// # Arguments
/// * `template` - certificate fields
/// * `spki_der` - subject public key in SPKI DER format
/// * `issuer` - issuer name and key identifier
/// * `signature_algorithm` - algorithm the issuer signs with
///
/// # Returns
/// Returns the `TbsCertificate` that is encoded and signed
pub fn build_unsigned(
    template: &CertificateTemplate,
    spki_der: &[u8],
    issuer: &IssuerRef,
    signature_algorithm: SignatureAlgorithm,
) -> Result<TbsCertificate> {
    let spki = SubjectPublicKeyInfoOwned::from_der(spki_der)
        .map_err(|e| PkiError::CodecError(format!("Failed to parse SPKI: {e}")))?;

    template.to_tbs(spki, issuer, signature_algorithm)
}

/// Attach a signature to an unsigned certificate body.
///
/// The signature is taken as-is, so a body rebuilt from a dehydrated record
/// can carry the signature that was stored alongside it.
pub fn assemble(
    tbs_certificate: TbsCertificate,
    signature_algorithm: SignatureAlgorithm,
    signature: &[u8],
) -> Result<Certificate> {
    Ok(Certificate {
        tbs_certificate,
        signature_algorithm: signature_algorithm.algorithm_identifier(),
        signature: BitString::from_bytes(signature)?,
    })
}

/// Sign a template with `issuer_key`.
///
/// # Arguments
/// * `template` - certificate fields
/// * `spki_der` - subject public key in SPKI DER format
/// * `issuer` - issuer name and key identifier
/// * `issuer_key` - issuer private key
///
/// # Returns
/// Returns the signed certificate and its DER encoding
pub fn sign_certificate(
    template: &CertificateTemplate,
    spki_der: &[u8],
    issuer: &IssuerRef,
    issuer_key: &KeyPair,
) -> Result<IssuedCertificate> {
    let signature_algorithm = issuer_key.signature_algorithm();
    let tbs = build_unsigned(template, spki_der, issuer, signature_algorithm)?;

    let tbs_der = tbs
        .to_der()
        .map_err(|e| PkiError::SigningError(format!("Failed to encode TBSCertificate: {e}")))?;
    let signature = issuer_key.sign(&tbs_der).map_err(|e| {
        PkiError::SigningError(format!(
            "Failed to sign {} certificate: {e}",
            template.role().label()
        ))
    })?;

    IssuedCertificate::new(assemble(tbs, signature_algorithm, &signature)?)
}

/// Self-sign a template. Self-signed certificates carry no
/// AuthorityKeyIdentifier.
pub fn self_sign_certificate(
    template: &CertificateTemplate,
    key: &KeyPair,
) -> Result<IssuedCertificate> {
    let issuer = IssuerRef {
        name: template.subject_name()?,
        key_identifier: None,
    };
    let public_key = key.public_key()?;
    sign_certificate(template, public_key.spki_der(), &issuer, key)
}

/// Uniformly random serial number for authority certificates
pub fn random_serial_number() -> Result<Vec<u8>> {
    let mut serial_number = [0u8; RANDOM_SERIAL_LEN];
    getrandom::fill(&mut serial_number)
        .map_err(|e| PkiError::ConfigError(format!("Failed to generate serial number: {e}")))?;
    Ok(serial_number.to_vec())
}

/// Check `certificate`'s signature against an issuer public key
pub fn verify_signature(certificate: &Certificate, issuer_spki_der: &[u8]) -> Result<()> {
    let tbs_der = certificate.tbs_certificate.to_der()?;
    let signature = certificate
        .signature
        .as_bytes()
        .ok_or_else(|| PkiError::CodecError("Signature has unused bits".to_string()))?;

    PublicKey::from_spki_der(issuer_spki_der)?.verify(&tbs_der, signature)?;
    Ok(())
}

/// Parse the first CERTIFICATE block of a PEM bundle
pub fn parse_first_certificate(pem_text: &str) -> Result<Certificate> {
    let blocks = pem::parse_many(pem_text)
        .map_err(|e| PkiError::CodecError(format!("Failed to parse PEM: {e}")))?;
    let block = blocks
        .iter()
        .find(|block| block.tag() == "CERTIFICATE")
        .ok_or_else(|| PkiError::CodecError("No CERTIFICATE block found".to_string()))?;

    Certificate::from_der(block.contents())
        .map_err(|e| PkiError::CodecError(format!("Failed to parse certificate: {e}")))
}
