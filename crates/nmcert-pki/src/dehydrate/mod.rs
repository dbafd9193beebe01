//! Dehydrated certificates
//!
//! A self-signed leaf is published as a compact record holding only its
//! public key, scaled validity timestamps, signature algorithm and
//! signature. Everything else is implied by the hostname, so the
//! certificate can be rebuilt byte-for-byte from the record:
//!
//! ```text
//! [1, pubkeyB64, notBeforeScaled, notAfterScaled, sigAlgCode, sigB64]
//! ```
//!
//! The serial number is derived from the record, which is what makes the
//! rebuilt certificate identical to the issued one.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use der::{Decode, Encode};
use nmcert_key::SignatureAlgorithm;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::Certificate;

use crate::{
    cert::{assemble, build_unsigned, CertificateTemplate, IssuerRef},
    error::{PkiError, Result},
    validity::{unix_seconds, ValidityWindow, TIMESTAMP_PRECISION},
};

/// Record format version
pub const DEHYDRATED_VERSION: i64 = 1;

/// Key under which the record is published in a Namecoin `tls` value
pub const DEHYDRATED_RECORD_KEY: &str = "d8";

/// Serial number length. 19 bytes keep the DER INTEGER within 20 octets.
pub const SERIAL_LEN: usize = 19;

/// Serial number inputs: public key and scaled validity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DehydratedRecord {
    /// Base64 of the SubjectPublicKeyInfo DER
    pub pubkey_b64: String,
    pub not_before_scaled: i64,
    pub not_after_scaled: i64,
}

impl DehydratedRecord {
    pub fn new(spki_der: &[u8], validity: &ValidityWindow) -> Self {
        Self {
            pubkey_b64: STANDARD.encode(spki_der),
            not_before_scaled: validity.not_before_scaled(),
            not_after_scaled: validity.not_after_scaled(),
        }
    }

    /// Derive the certificate serial number for `name`.
    ///
    /// `SHA256(SHA256(name) || SHA256(pubkey) || be64(notBefore) || be64(notAfter))`
    /// truncated to [`SERIAL_LEN`] bytes.
    pub fn serial_number(&self, name: &str) -> Result<Vec<u8>> {
        let pubkey = self.pubkey_der()?;

        let mut hasher = Sha256::new();
        hasher.update(Sha256::digest(name.as_bytes()));
        hasher.update(Sha256::digest(&pubkey));
        hasher.update(self.not_before_scaled.to_be_bytes());
        hasher.update(self.not_after_scaled.to_be_bytes());

        Ok(hasher.finalize()[..SERIAL_LEN].to_vec())
    }

    pub fn pubkey_der(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.pubkey_b64)
            .map_err(|e| PkiError::CodecError(format!("Invalid public key base64: {e}")))
    }

    pub fn validity(&self) -> Result<ValidityWindow> {
        ValidityWindow::from_scaled(self.not_before_scaled, self.not_after_scaled)
    }
}

/// Compact form of a self-signed leaf certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DehydratedCertificate {
    pub record: DehydratedRecord,
    /// Signature algorithm code
    pub signature_algorithm: i64,
    /// Base64 of the signature BIT STRING contents
    pub signature_b64: String,
}

impl DehydratedCertificate {
    /// JSON array form
    pub fn to_json(&self) -> Value {
        json!([
            DEHYDRATED_VERSION,
            self.record.pubkey_b64,
            self.record.not_before_scaled,
            self.record.not_after_scaled,
            self.signature_algorithm,
            self.signature_b64,
        ])
    }

    /// `{"d8": [...]}` object suitable for a Namecoin `tls` field
    pub fn to_namecoin_value(&self) -> Value {
        json!({ DEHYDRATED_RECORD_KEY: self.to_json() })
    }

    /// Parse the JSON array form
    pub fn from_json(value: &Value) -> Result<Self> {
        let fields = value
            .as_array()
            .ok_or_else(|| PkiError::CodecError("Dehydrated certificate is not an array".to_string()))?;

        if fields.len() != 6 {
            return Err(PkiError::CodecError(format!(
                "Dehydrated certificate has {} fields, expected 6",
                fields.len()
            )));
        }

        let version = int_field(fields, 0, "version")?;
        if version != DEHYDRATED_VERSION {
            return Err(PkiError::CodecError(format!(
                "Unsupported dehydrated certificate version {version}"
            )));
        }

        Ok(Self {
            record: DehydratedRecord {
                pubkey_b64: string_field(fields, 1, "public key")?,
                not_before_scaled: int_field(fields, 2, "notBefore")?,
                not_after_scaled: int_field(fields, 3, "notAfter")?,
            },
            signature_algorithm: int_field(fields, 4, "signature algorithm")?,
            signature_b64: string_field(fields, 5, "signature")?,
        })
    }

    /// Parse either the bare array or the `{"d8": [...]}` object
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        match value.get(DEHYDRATED_RECORD_KEY) {
            Some(inner) => Self::from_json(inner),
            None => Self::from_json(&value),
        }
    }
}

impl std::fmt::Display for DehydratedCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn int_field(fields: &[Value], index: usize, name: &str) -> Result<i64> {
    fields[index]
        .as_i64()
        .ok_or_else(|| PkiError::CodecError(format!("Dehydrated {name} is not an integer")))
}

fn string_field(fields: &[Value], index: usize, name: &str) -> Result<String> {
    fields[index]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PkiError::CodecError(format!("Dehydrated {name} is not a string")))
}

/// Fields recovered from a dehydrated certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RehydratedTemplate {
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    pub validity: ValidityWindow,
    pub signature_algorithm: SignatureAlgorithm,
    pub signature: Vec<u8>,
}

/// Reduce a parsed certificate to its compact form
pub fn dehydrate_cert(certificate: &Certificate) -> Result<DehydratedCertificate> {
    let tbs = &certificate.tbs_certificate;
    let pubkey = tbs.subject_public_key_info.to_der()?;

    let not_before = unix_seconds(&tbs.validity.not_before)?;
    let not_after = unix_seconds(&tbs.validity.not_after)?;

    let signature_algorithm = SignatureAlgorithm::from_oid(certificate.signature_algorithm.oid)?;
    let signature = certificate
        .signature
        .as_bytes()
        .ok_or_else(|| PkiError::CodecError("Signature has unused bits".to_string()))?;

    Ok(DehydratedCertificate {
        record: DehydratedRecord {
            pubkey_b64: STANDARD.encode(pubkey),
            not_before_scaled: not_before.div_euclid(TIMESTAMP_PRECISION),
            not_after_scaled: not_after.div_euclid(TIMESTAMP_PRECISION),
        },
        signature_algorithm: signature_algorithm.code(),
        signature_b64: STANDARD.encode(signature),
    })
}

/// Decode the compact form back into template fields
pub fn rehydrate_cert(dehydrated: &DehydratedCertificate) -> Result<RehydratedTemplate> {
    let pubkey = dehydrated.record.pubkey_der()?;
    let subject_public_key_info = SubjectPublicKeyInfoOwned::from_der(&pubkey)
        .map_err(|e| PkiError::CodecError(format!("Invalid dehydrated public key: {e}")))?;

    let signature = STANDARD
        .decode(&dehydrated.signature_b64)
        .map_err(|e| PkiError::CodecError(format!("Invalid signature base64: {e}")))?;

    Ok(RehydratedTemplate {
        subject_public_key_info,
        validity: dehydrated.record.validity()?,
        signature_algorithm: SignatureAlgorithm::from_code(dehydrated.signature_algorithm)?,
        signature,
    })
}

/// Rebuild the self-signed leaf certificate DER for `name`
pub fn fill_rehydrated_template(template: &RehydratedTemplate, name: &str) -> Result<Vec<u8>> {
    let spki_der = template.subject_public_key_info.to_der()?;
    let record = DehydratedRecord::new(&spki_der, &template.validity);
    let serial_number = record.serial_number(name)?;

    let leaf = CertificateTemplate::leaf(&[name.to_string()], template.validity, serial_number)?;
    let issuer = IssuerRef {
        name: leaf.subject_name()?,
        key_identifier: None,
    };

    let tbs = build_unsigned(&leaf, &spki_der, &issuer, template.signature_algorithm)?;
    let certificate = assemble(tbs, template.signature_algorithm, &template.signature)?;
    Ok(certificate.to_der()?)
}
