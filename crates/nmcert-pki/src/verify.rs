//! Round-trip check for dehydrated certificates
//!
//! Only the compact record is published, so a leaf is accepted only when
//! dehydrating it, publishing the record and rebuilding from the record
//! yields the exact issued DER.

use der::Decode;
use x509_cert::Certificate;

use crate::{
    dehydrate::{dehydrate_cert, fill_rehydrated_template, rehydrate_cert, DehydratedCertificate},
    error::{PkiError, Result},
};

/// Dehydrate `der`, rebuild it for `hostname`, and compare byte-for-byte.
///
/// Returns the dehydrated certificate on success. Any difference is a
/// `RoundTripIntegrityError`.
pub fn verify_round_trip(der: &[u8], hostname: &str) -> Result<DehydratedCertificate> {
    let certificate = Certificate::from_der(der)
        .map_err(|e| PkiError::CodecError(format!("Failed to parse issued certificate: {e}")))?;
    let dehydrated = dehydrate_cert(&certificate)?;

    // go through the published text form, not just the in-memory value
    let published = DehydratedCertificate::from_json_str(&dehydrated.to_string())?;
    let rehydrated = rehydrate_cert(&published)?;
    let refilled = fill_rehydrated_template(&rehydrated, hostname)?;

    if refilled != der {
        tracing::error!(
            hostname,
            issued_len = der.len(),
            rehydrated_len = refilled.len(),
            "rehydrated certificate differs from issued certificate"
        );
        return Err(PkiError::RoundTripIntegrityError);
    }

    tracing::debug!(hostname, record = %dehydrated, "dehydrated certificate round-trips");
    Ok(dehydrated)
}
