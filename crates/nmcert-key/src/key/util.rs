use std::convert::TryFrom;

use const_oid::{AssociatedOid, ObjectIdentifier};
use der::Decode;
use pkcs8::{der::pem::PemLabel, spki::der::asn1::AnyRef, PrivateKeyInfo, SecretDocument};
use spki::SubjectPublicKeyInfoRef;

use super::Algorithm;
use crate::error::{Error, Result};

/// Detect the key algorithm of a PKCS#8 PEM private key.
///
/// Returns the algorithm together with the decoded DER document so the
/// caller does not have to decode the PEM a second time.
pub fn detect_algorithm_from_pem(pem: &str) -> Result<(Algorithm, SecretDocument)> {
    let (label, doc) = SecretDocument::from_pem(pem)
        .map_err(|e| Error::ImportError(format!("Failed to decode PEM: {e}")))?;

    if label != PrivateKeyInfo::PEM_LABEL {
        return Err(Error::ImportError(format!("Invalid PKCS#8 label: {label}")));
    }

    let algorithm = detect_algorithm_from_der(doc.as_bytes())?;
    Ok((algorithm, doc))
}

/// Detect the key algorithm of a PKCS#8 DER private key.
pub fn detect_algorithm_from_der(der: &[u8]) -> Result<Algorithm> {
    let info = PrivateKeyInfo::try_from(der)
        .map_err(|e| Error::ImportError(format!("Failed to parse PKCS#8: {e}")))?;

    algorithm_from_identifier(info.algorithm.oid, info.algorithm.parameters)
}

/// Detect the key algorithm of a DER SubjectPublicKeyInfo.
pub fn detect_algorithm_from_spki(spki_der: &[u8]) -> Result<Algorithm> {
    let spki = SubjectPublicKeyInfoRef::from_der(spki_der)
        .map_err(|e| Error::ImportError(format!("Failed to parse SPKI: {e}")))?;

    algorithm_from_identifier(spki.algorithm.oid, spki.algorithm.parameters)
}

fn algorithm_from_identifier(
    oid: ObjectIdentifier,
    parameters: Option<AnyRef<'_>>,
) -> Result<Algorithm> {
    if oid == const_oid::db::rfc8410::ID_ED_25519 {
        return Ok(Algorithm::Ed25519);
    }

    if oid != const_oid::db::rfc5912::ID_EC_PUBLIC_KEY {
        return Err(Error::UnsupportedAlgorithm(format!(
            "Unsupported key algorithm OID: {oid}"
        )));
    }

    let params = parameters
        .ok_or_else(|| Error::ImportError("EC key is missing curve parameters".to_string()))?;
    let curve_oid = parse_curve_oid(params)?;

    match curve_oid {
        oid if oid == p224::NistP224::OID => Ok(Algorithm::P224),
        oid if oid == p256::NistP256::OID => Ok(Algorithm::P256),
        oid if oid == p384::NistP384::OID => Ok(Algorithm::P384),
        oid if oid == p521::NistP521::OID => Ok(Algorithm::P521),
        other => Err(Error::UnsupportedAlgorithm(format!(
            "Unsupported EC curve OID: {other}"
        ))),
    }
}

fn parse_curve_oid(any: AnyRef<'_>) -> Result<ObjectIdentifier> {
    ObjectIdentifier::try_from(any)
        .map_err(|e| Error::ImportError(format!("Failed to parse curve OID: {e}")))
}

/// Named-curve OID for an EC algorithm, `None` for Ed25519.
pub fn curve_oid(algorithm: Algorithm) -> Option<ObjectIdentifier> {
    match algorithm {
        Algorithm::P224 => Some(p224::NistP224::OID),
        Algorithm::P256 => Some(p256::NistP256::OID),
        Algorithm::P384 => Some(p384::NistP384::OID),
        Algorithm::P521 => Some(p521::NistP521::OID),
        Algorithm::Ed25519 => None,
    }
}
