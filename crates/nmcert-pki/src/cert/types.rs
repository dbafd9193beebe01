use const_oid::AssociatedOid;
use der::{pem::LineEnding, Decode, Encode, EncodePem};
use x509_cert::{ext::pkix::SubjectKeyIdentifier, name::Name, Certificate};

use crate::error::{PkiError, Result};

/// Issuer side of a certificate: the name placed in the issuer field and
/// the key identifier copied into AuthorityKeyIdentifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerRef {
    /// Issuer distinguished name
    pub name: Name,
    /// Issuer's SubjectKeyIdentifier, if it has one
    pub key_identifier: Option<Vec<u8>>,
}

impl IssuerRef {
    /// Issuer reference for certificates signed by `certificate`'s key
    pub fn from_certificate(certificate: &Certificate) -> Result<Self> {
        Ok(Self {
            name: certificate.tbs_certificate.subject.clone(),
            key_identifier: subject_key_identifier(certificate)?,
        })
    }
}

/// Signed certificate together with its DER encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    /// Parsed certificate
    pub certificate: Certificate,
    /// DER encoding as signed
    pub der: Vec<u8>,
}

impl IssuedCertificate {
    pub fn new(certificate: Certificate) -> Result<Self> {
        let der = certificate.to_der()?;
        Ok(Self { certificate, der })
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let certificate = Certificate::from_der(der)?;
        Ok(Self {
            certificate,
            der: der.to_vec(),
        })
    }

    /// PEM encoding with LF line endings
    pub fn to_pem(&self) -> Result<String> {
        Ok(self.certificate.to_pem(LineEnding::LF)?)
    }

    pub fn issuer_ref(&self) -> Result<IssuerRef> {
        IssuerRef::from_certificate(&self.certificate)
    }

    /// DER SubjectPublicKeyInfo of the certificate
    pub fn subject_public_key_der(&self) -> Result<Vec<u8>> {
        Ok(self.certificate.tbs_certificate.subject_public_key_info.to_der()?)
    }
}

/// SubjectKeyIdentifier extension value, if present
pub fn subject_key_identifier(certificate: &Certificate) -> Result<Option<Vec<u8>>> {
    let Some(extensions) = &certificate.tbs_certificate.extensions else {
        return Ok(None);
    };

    extensions
        .iter()
        .find(|ext| ext.extn_id == SubjectKeyIdentifier::OID)
        .map(|ext| {
            SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes())
                .map(|ski| ski.0.as_bytes().to_vec())
                .map_err(|e| PkiError::CodecError(format!("Malformed SubjectKeyIdentifier: {e}")))
        })
        .transpose()
}
