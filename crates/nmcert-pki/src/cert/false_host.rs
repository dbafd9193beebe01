//! False certificates for probing validators
//!
//! A false certificate names an unrelated host and is signed by the freshly
//! issued leaf's key. The leaf is not a CA and has no CertSign usage, so any
//! validator that accepts the false certificate is not enforcing
//! BasicConstraints or KeyUsage.

use nmcert_key::{Algorithm, KeyPair};

use super::{
    cert_utils::sign_certificate,
    template::CertificateTemplate,
    types::IssuedCertificate,
};
use crate::{error::Result, validity::ValidityWindow};

/// False certificate and its private key
#[derive(Debug)]
pub struct FalseCertificate {
    pub certificate: IssuedCertificate,
    pub key: KeyPair,
}

/// Issue a false certificate for `false_host` under a non-CA leaf.
///
/// # Arguments
/// * `false_host` - hostname the leaf has no authority over
/// * `algorithm` - algorithm of the false certificate's own key
/// * `validity` - floored validity window
/// * `leaf` - certificate whose subject becomes the issuer
/// * `leaf_key` - private key of `leaf`
pub fn issue_false_certificate(
    false_host: &str,
    algorithm: Algorithm,
    validity: ValidityWindow,
    leaf: &IssuedCertificate,
    leaf_key: &KeyPair,
) -> Result<FalseCertificate> {
    let key = KeyPair::generate(algorithm)?;
    let template = CertificateTemplate::false_leaf(false_host, validity)?;
    let public_key = key.public_key()?;

    let certificate =
        sign_certificate(&template, public_key.spki_der(), &leaf.issuer_ref()?, leaf_key)?;
    tracing::warn!(
        host = false_host,
        "issued false certificate; it must be rejected by a correct validator"
    );

    Ok(FalseCertificate { certificate, key })
}

#[cfg(test)]
mod tests {
    use der::Decode;
    use spki::SubjectPublicKeyInfoOwned;
    use x509_cert::serial_number::SerialNumber;

    use super::*;
    use crate::cert::cert_utils::{self_sign_certificate, verify_signature};

    #[test]
    fn test_false_certificate_is_signed_by_leaf() {
        let validity = ValidityWindow::floored(1_700_000_000, 86_400).unwrap();
        let leaf_key = KeyPair::generate(Algorithm::P256).unwrap();
        let leaf_template =
            CertificateTemplate::leaf(&["real.bit".to_string()], validity, vec![3]).unwrap();
        let leaf: IssuedCertificate = self_sign_certificate(&leaf_template, &leaf_key).unwrap();

        let false_cert =
            issue_false_certificate("victim.bit", Algorithm::P256, validity, &leaf, &leaf_key)
                .unwrap();
        let tbs = &false_cert.certificate.certificate.tbs_certificate;

        assert_eq!(tbs.serial_number, SerialNumber::new(&[2]).unwrap());
        assert_eq!(tbs.issuer, leaf.certificate.tbs_certificate.subject);
        assert_eq!(
            tbs.subject_public_key_info,
            SubjectPublicKeyInfoOwned::from_der(false_cert.key.public_key().unwrap().spki_der())
                .unwrap()
        );
        verify_signature(
            &false_cert.certificate.certificate,
            leaf_key.public_key().unwrap().spki_der(),
        )
        .unwrap();
    }
}
