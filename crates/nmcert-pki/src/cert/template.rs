//! Role-specific certificate templates
//!
//! A [`CertificateTemplate`] holds everything that varies per certificate.
//! [`CertificateTemplate::to_tbs`] turns it into a `TbsCertificate` and is
//! the only place extensions are laid out, so issuance and rehydration
//! produce identical bytes for identical inputs.

use const_oid::{AssociatedOid, ObjectIdentifier};
use der::{
    asn1::{Any, Ia5String, OctetString, PrintableStringRef, SetOfVec, Utf8StringRef},
    Encode,
};
use nmcert_key::SignatureAlgorithm;
use sha2::{Digest, Sha256};
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::{
    attr::AttributeTypeAndValue,
    certificate::Version,
    ext::{
        pkix::{
            constraints::name::{GeneralSubtree, GeneralSubtrees},
            name::GeneralName,
            AccessDescription, AuthorityInfoAccessSyntax, AuthorityKeyIdentifier,
            BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages, NameConstraints,
            SubjectAltName, SubjectKeyIdentifier,
        },
        Extension,
    },
    name::{Name, RdnSequence, RelativeDistinguishedName},
    serial_number::SerialNumber,
    TbsCertificate,
};

use super::types::IssuerRef;
use crate::{
    error::{PkiError, Result},
    validity::ValidityWindow,
};

/// Value of the subject serialNumber attribute on every certificate
pub const SUBJECT_SERIAL_NUMBER: &str = "Namecoin TLS Certificate";

/// Serial number of false certificates
pub const FALSE_CERT_SERIAL: u8 = 2;

const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const SERIAL_NUMBER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.5");

/// Position of a certificate in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Leaf,
    Ca,
    GrandparentCa,
    FalseLeaf,
}

impl Role {
    pub fn is_ca(self) -> bool {
        matches!(self, Role::Ca | Role::GrandparentCa)
    }

    /// Role of the authority that signs a certificate of this role
    pub fn issuer_role(self) -> Role {
        match self {
            Role::Leaf | Role::FalseLeaf => Role::Ca,
            Role::Ca | Role::GrandparentCa => Role::GrandparentCa,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Leaf => "leaf",
            Role::Ca => "CA",
            Role::GrandparentCa => "grandparent CA",
            Role::FalseLeaf => "false leaf",
        }
    }
}

/// Certificate fields prior to signing
#[derive(Debug, Clone)]
pub struct CertificateTemplate {
    role: Role,
    serial_number: Vec<u8>,
    common_name: String,
    dns_names: Vec<String>,
    permitted_dns_domains: Vec<String>,
    validity: ValidityWindow,
    issuing_certificate_urls: Vec<String>,
}

impl CertificateTemplate {
    /// End-entity template for `hosts`. The first host is the common name.
    pub fn leaf(hosts: &[String], validity: ValidityWindow, serial_number: Vec<u8>) -> Result<Self> {
        let primary = primary_host(hosts)?;
        Ok(Self {
            role: Role::Leaf,
            serial_number,
            common_name: primary.to_string(),
            dns_names: hosts.to_vec(),
            permitted_dns_domains: Vec::new(),
            validity,
            issuing_certificate_urls: Vec::new(),
        })
    }

    /// CA template name-constrained to `hosts`.
    ///
    /// # Arguments
    /// * `role` - `Role::Ca` or `Role::GrandparentCa`
    /// * `hosts` - permitted DNS domains, the first one names the CA
    /// * `validity` - floored validity window
    /// * `serial_number` - random serial bytes
    pub fn authority(
        role: Role,
        hosts: &[String],
        validity: ValidityWindow,
        serial_number: Vec<u8>,
    ) -> Result<Self> {
        let primary = primary_host(hosts)?;
        let common_name = match role {
            Role::Ca => format!("{primary} Domain CA"),
            Role::GrandparentCa => format!("{primary} Root CA"),
            Role::Leaf | Role::FalseLeaf => {
                return Err(PkiError::ConfigError(format!(
                    "{} is not an authority role",
                    role.label()
                )))
            }
        };
        Ok(Self {
            role,
            serial_number,
            common_name,
            dns_names: Vec::new(),
            permitted_dns_domains: hosts.to_vec(),
            validity,
            issuing_certificate_urls: Vec::new(),
        })
    }

    /// Leaf-shaped template for an unrelated host with the fixed serial 2
    pub fn false_leaf(host: &str, validity: ValidityWindow) -> Result<Self> {
        if host.is_empty() {
            return Err(PkiError::MissingHostname);
        }
        Ok(Self {
            role: Role::FalseLeaf,
            serial_number: vec![FALSE_CERT_SERIAL],
            common_name: host.to_string(),
            dns_names: vec![host.to_string()],
            permitted_dns_domains: Vec::new(),
            validity,
            issuing_certificate_urls: Vec::new(),
        })
    }

    /// Attach AIA caIssuers URLs. Only authorities carry them.
    pub fn with_issuing_certificate_urls(mut self, urls: Vec<String>) -> Result<Self> {
        if !self.role.is_ca() {
            return Err(PkiError::ConfigError(format!(
                "AIA URLs on a {} certificate",
                self.role.label()
            )));
        }
        self.issuing_certificate_urls = urls;
        Ok(self)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    pub fn permitted_dns_domains(&self) -> &[String] {
        &self.permitted_dns_domains
    }

    pub fn validity(&self) -> ValidityWindow {
        self.validity
    }

    pub fn issuing_certificate_urls(&self) -> &[String] {
        &self.issuing_certificate_urls
    }

    /// Subject DN: CN followed by the fixed serialNumber attribute
    pub fn subject_name(&self) -> Result<Name> {
        let common_name = AttributeTypeAndValue {
            oid: COMMON_NAME,
            value: directory_string(&self.common_name)?,
        };
        let serial = AttributeTypeAndValue {
            oid: SERIAL_NUMBER,
            value: Any::encode_from(&PrintableStringRef::new(SUBJECT_SERIAL_NUMBER)?)?,
        };

        Ok(RdnSequence(vec![rdn(common_name)?, rdn(serial)?]))
    }

    /// Build the unsigned certificate body.
    ///
    /// # Arguments
    /// * `subject_public_key` - subject key
    /// * `issuer` - issuer name and optional key identifier
    /// * `signature_algorithm` - algorithm of the issuer's key
    pub fn to_tbs(
        &self,
        subject_public_key: SubjectPublicKeyInfoOwned,
        issuer: &IssuerRef,
        signature_algorithm: SignatureAlgorithm,
    ) -> Result<TbsCertificate> {
        let extensions = self.extensions(&subject_public_key, issuer)?;

        Ok(TbsCertificate {
            version: Version::V3,
            serial_number: SerialNumber::new(&self.serial_number)?,
            signature: signature_algorithm.algorithm_identifier(),
            issuer: issuer.name.clone(),
            validity: self.validity.to_x509()?,
            subject: self.subject_name()?,
            subject_public_key_info: subject_public_key,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        })
    }

    fn extensions(
        &self,
        subject_public_key: &SubjectPublicKeyInfoOwned,
        issuer: &IssuerRef,
    ) -> Result<Vec<Extension>> {
        let is_ca = self.role.is_ca();
        let key_usage = if is_ca {
            KeyUsages::KeyCertSign
        } else {
            // ECDSA and Ed25519 keys never need KeyEncipherment
            KeyUsages::DigitalSignature
        };

        let mut extensions = vec![
            extension(&KeyUsage(key_usage.into()), true)?,
            extension(
                &ExtendedKeyUsage(vec![const_oid::db::rfc5280::ID_KP_SERVER_AUTH]),
                false,
            )?,
            extension(
                &BasicConstraints {
                    ca: is_ca,
                    path_len_constraint: None,
                },
                true,
            )?,
        ];

        if is_ca {
            let key_id = key_identifier(subject_public_key);
            extensions.push(extension(
                &SubjectKeyIdentifier(OctetString::new(key_id)?),
                false,
            )?);
        }

        if let Some(key_id) = &issuer.key_identifier {
            extensions.push(extension(
                &AuthorityKeyIdentifier {
                    key_identifier: Some(OctetString::new(key_id.clone())?),
                    authority_cert_issuer: None,
                    authority_cert_serial_number: None,
                },
                false,
            )?);
        }

        if !self.dns_names.is_empty() {
            extensions.push(extension(&SubjectAltName(dns_names(&self.dns_names)?), false)?);
        }

        if !self.permitted_dns_domains.is_empty() {
            let permitted: GeneralSubtrees = dns_names(&self.permitted_dns_domains)?
                .into_iter()
                .map(|base| GeneralSubtree {
                    base,
                    minimum: 0,
                    maximum: None,
                })
                .collect();
            extensions.push(extension(
                &NameConstraints {
                    permitted_subtrees: Some(permitted),
                    excluded_subtrees: None,
                },
                true,
            )?);
        }

        if !self.issuing_certificate_urls.is_empty() {
            let descriptions = self
                .issuing_certificate_urls
                .iter()
                .map(|url| {
                    Ok(AccessDescription {
                        access_method: const_oid::db::rfc5280::ID_AD_CA_ISSUERS,
                        access_location: GeneralName::UniformResourceIdentifier(Ia5String::new(
                            url.as_str(),
                        )?),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            extensions.push(extension(&AuthorityInfoAccessSyntax(descriptions), false)?);
        }

        Ok(extensions)
    }
}

/// Key identifier: leftmost 160 bits of SHA-256 over the subjectPublicKey
/// bits (RFC 7093 section 2, method 1)
pub fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    Sha256::digest(spki.subject_public_key.raw_bytes())[..20].to_vec()
}

fn primary_host(hosts: &[String]) -> Result<&str> {
    match hosts.first() {
        Some(host) if !host.is_empty() => Ok(host),
        _ => Err(PkiError::MissingHostname),
    }
}

/// PrintableString when every byte is in its alphabet, UTF8String otherwise.
///
/// Matches Go's `encoding/asn1`, which resolvers use to rebuild dehydrated
/// leaves; `*` and `&` force UTF8String there too.
fn directory_string(value: &str) -> Result<Any> {
    let printable = value.bytes().all(|b| {
        b.is_ascii_alphanumeric() || b" '()+,-./:=?".contains(&b)
    });

    if printable {
        Ok(Any::encode_from(&PrintableStringRef::new(value)?)?)
    } else {
        Ok(Any::encode_from(&Utf8StringRef::new(value)?)?)
    }
}

fn rdn(atv: AttributeTypeAndValue) -> Result<RelativeDistinguishedName> {
    Ok(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?))
}

fn dns_names(hosts: &[String]) -> Result<Vec<GeneralName>> {
    hosts
        .iter()
        .map(|host| Ok(GeneralName::DnsName(Ia5String::new(host.as_str())?)))
        .collect()
}

fn extension<E: AssociatedOid + Encode>(value: &E, critical: bool) -> Result<Extension> {
    Ok(Extension {
        extn_id: E::OID,
        critical,
        extn_value: OctetString::new(value.to_der()?)?,
    })
}
