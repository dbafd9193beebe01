//! Signature algorithm registry and public key verification

use const_oid::ObjectIdentifier;
use ecdsa::signature::hazmat::PrehashVerifier;
use ed25519_dalek::Verifier;
use pkcs8::DecodePublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;

use crate::{
    error::{Error, Result},
    key::{util, Algorithm},
};

/// Certificate signature algorithms
///
/// The integer codes are the ones carried in a dehydrated certificate
/// record, so they must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    EcdsaWithSha256,
    EcdsaWithSha384,
    EcdsaWithSha512,
    Ed25519,
}

impl SignatureAlgorithm {
    pub fn code(self) -> i64 {
        match self {
            SignatureAlgorithm::EcdsaWithSha256 => 10,
            SignatureAlgorithm::EcdsaWithSha384 => 11,
            SignatureAlgorithm::EcdsaWithSha512 => 12,
            SignatureAlgorithm::Ed25519 => 16,
        }
    }

    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            10 => Ok(SignatureAlgorithm::EcdsaWithSha256),
            11 => Ok(SignatureAlgorithm::EcdsaWithSha384),
            12 => Ok(SignatureAlgorithm::EcdsaWithSha512),
            16 => Ok(SignatureAlgorithm::Ed25519),
            other => Err(Error::UnsupportedAlgorithm(format!(
                "Unknown signature algorithm code: {other}"
            ))),
        }
    }

    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::EcdsaWithSha256 => const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            SignatureAlgorithm::EcdsaWithSha384 => const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
            SignatureAlgorithm::EcdsaWithSha512 => const_oid::db::rfc5912::ECDSA_WITH_SHA_512,
            SignatureAlgorithm::Ed25519 => const_oid::db::rfc8410::ID_ED_25519,
        }
    }

    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        [
            SignatureAlgorithm::EcdsaWithSha256,
            SignatureAlgorithm::EcdsaWithSha384,
            SignatureAlgorithm::EcdsaWithSha512,
            SignatureAlgorithm::Ed25519,
        ]
        .into_iter()
        .find(|alg| alg.oid() == oid)
        .ok_or_else(|| {
            Error::UnsupportedAlgorithm(format!("Unsupported signature algorithm OID: {oid}"))
        })
    }

    /// AlgorithmIdentifier for certificates. All supported algorithms omit
    /// the parameters field.
    pub fn algorithm_identifier(self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: None,
        }
    }
}

/// Public key as a DER SubjectPublicKeyInfo plus its algorithm tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    algorithm: Algorithm,
    spki_der: Vec<u8>,
}

impl PublicKey {
    pub(crate) fn new(algorithm: Algorithm, spki_der: Vec<u8>) -> Self {
        Self {
            algorithm,
            spki_der,
        }
    }

    /// Parse a DER SubjectPublicKeyInfo, detecting the algorithm
    pub fn from_spki_der(spki_der: &[u8]) -> Result<Self> {
        let algorithm = util::detect_algorithm_from_spki(spki_der)?;
        Ok(Self::new(algorithm, spki_der.to_vec()))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// SHA-256 over the SPKI DER
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(&self.spki_der).into()
    }

    /// Verify a signature produced by [`crate::KeyPair::sign`]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        match self.algorithm {
            Algorithm::P224 => {
                let key = p224::PublicKey::from_public_key_der(&self.spki_der)
                    .map_err(import_failed)?;
                let signature = ecdsa::Signature::<p224::NistP224>::from_der(signature)
                    .map_err(|_| Error::InvalidSignature)?;
                ecdsa::VerifyingKey::<p224::NistP224>::from(&key)
                    .verify_prehash(&Sha256::digest(message), &signature)
            }
            Algorithm::P256 => {
                let key = p256::PublicKey::from_public_key_der(&self.spki_der)
                    .map_err(import_failed)?;
                let signature = ecdsa::Signature::<p256::NistP256>::from_der(signature)
                    .map_err(|_| Error::InvalidSignature)?;
                ecdsa::VerifyingKey::<p256::NistP256>::from(&key)
                    .verify_prehash(&Sha256::digest(message), &signature)
            }
            Algorithm::P384 => {
                let key = p384::PublicKey::from_public_key_der(&self.spki_der)
                    .map_err(import_failed)?;
                let signature = ecdsa::Signature::<p384::NistP384>::from_der(signature)
                    .map_err(|_| Error::InvalidSignature)?;
                ecdsa::VerifyingKey::<p384::NistP384>::from(&key)
                    .verify_prehash(&Sha384::digest(message), &signature)
            }
            Algorithm::P521 => {
                let key = p521::PublicKey::from_public_key_der(&self.spki_der)
                    .map_err(import_failed)?;
                let signature = ecdsa::Signature::<p521::NistP521>::from_der(signature)
                    .map_err(|_| Error::InvalidSignature)?;
                ecdsa::VerifyingKey::<p521::NistP521>::from(&key)
                    .verify_prehash(&Sha512::digest(message), &signature)
            }
            Algorithm::Ed25519 => {
                let key = ed25519_dalek::VerifyingKey::from_public_key_der(&self.spki_der)
                    .map_err(import_failed)?;
                let signature = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|_| Error::InvalidSignature)?;
                key.verify(message, &signature)
            }
        }
        .map_err(|_| Error::InvalidSignature)
    }
}

fn import_failed(e: spki::Error) -> Error {
    Error::ImportError(format!("Failed to decode public key: {e}"))
}
