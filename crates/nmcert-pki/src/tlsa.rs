//! DANE-style trust pins
//!
//! A CA minted without AIA is published as `[2, 1, 0, "<base64 SPKI>"]`:
//! usage DANE-TA, selector SPKI, matching type Full.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use nmcert_key::KeyPair;
use serde_json::{json, Value};

use crate::error::Result;

/// Certificate usage 2: trust anchor assertion
pub const USAGE_DANE_TA: u8 = 2;
/// Selector 1: SubjectPublicKeyInfo
pub const SELECTOR_SPKI: u8 = 1;
/// Matching type 0: full contents
pub const MATCHING_FULL: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsaRecord {
    pub usage: u8,
    pub selector: u8,
    pub matching_type: u8,
    /// SPKI DER, EC points compressed
    pub data: Vec<u8>,
}

impl TlsaRecord {
    /// Full-SPKI trust anchor pin for `key`
    pub fn from_key(key: &KeyPair) -> Result<Self> {
        Ok(Self {
            usage: USAGE_DANE_TA,
            selector: SELECTOR_SPKI,
            matching_type: MATCHING_FULL,
            data: key.compressed_spki_der()?,
        })
    }

    pub fn to_json(&self) -> Value {
        json!([
            self.usage,
            self.selector,
            self.matching_type,
            STANDARD.encode(&self.data)
        ])
    }
}

#[cfg(test)]
mod tests {
    use nmcert_key::Algorithm;

    use super::*;

    #[test]
    fn test_tlsa_json_shape() {
        let key = KeyPair::generate(Algorithm::P256).unwrap();
        let record = TlsaRecord::from_key(&key).unwrap();
        let json = record.to_json();
        let fields = json.as_array().unwrap();

        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], 2);
        assert_eq!(fields[1], 1);
        assert_eq!(fields[2], 0);
        let spki = STANDARD.decode(fields[3].as_str().unwrap()).unwrap();
        assert_eq!(spki, key.compressed_spki_der().unwrap());
    }
}
