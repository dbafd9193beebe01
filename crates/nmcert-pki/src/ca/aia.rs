//! Authority Information Access pointers
//!
//! Instead of bundling its issuer, an AIA-anchored CA names a resolver URL
//! from which the issuer certificate can be fetched. The URL is only
//! constructed here, never fetched.

use sha2::{Digest, Sha256};

/// Default resolver host and path
pub const DEFAULT_AIA_BASE: &str = "aia.x--nmc.bit/aia";

/// Build the https and http caIssuers URLs for an issuer.
///
/// # Arguments
/// * `base` - resolver host and path, without scheme
/// * `hosts` - domains the CA is constrained to, joined with `,`
/// * `issuer_spki_der` - DER SubjectPublicKeyInfo of the issuer
pub fn issuing_certificate_urls(base: &str, hosts: &[String], issuer_spki_der: &[u8]) -> Vec<String> {
    let fingerprint = hex::encode(Sha256::digest(issuer_spki_der));
    let path = format!("{base}?domain={}&pubsha256={fingerprint}", hosts.join(","));

    vec![format!("https://{path}"), format!("http://{path}")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_carry_domain_and_fingerprint() {
        let hosts = vec!["a.bit".to_string(), "b.bit".to_string()];
        let urls = issuing_certificate_urls(DEFAULT_AIA_BASE, &hosts, b"spki");
        let fingerprint = hex::encode(Sha256::digest(b"spki"));

        assert_eq!(urls.len(), 2);
        assert_eq!(
            urls[0],
            format!("https://aia.x--nmc.bit/aia?domain=a.bit,b.bit&pubsha256={fingerprint}")
        );
        assert_eq!(
            urls[1],
            format!("http://aia.x--nmc.bit/aia?domain=a.bit,b.bit&pubsha256={fingerprint}")
        );
    }
}
