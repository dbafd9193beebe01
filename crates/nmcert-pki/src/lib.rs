//! nmcert PKI - certificates for Namecoin domains
//!
//! Builds leaf, CA and grandparent CA certificates for `.bit` domains,
//! derives leaf serial numbers from a compact dehydrated record, and checks
//! that the record rebuilds the issued certificate byte for byte.

pub mod ca;
pub mod cert;
pub mod chain;
pub mod config;
pub mod dehydrate;
pub mod error;
pub mod issuance;
pub mod output;
pub mod tlsa;
pub mod validity;
pub mod verify;

// Re-export commonly used types
pub use ca::{
    issuing_certificate_urls, resolve_issuer, AnchorStrategy, Authority, AuthorityOrigin,
    ExistingAuthority, IssueContext, KeySource, DEFAULT_AIA_BASE,
};
pub use cert::{
    assemble, build_unsigned, issue_false_certificate, self_sign_certificate, sign_certificate,
    CertificateTemplate, FalseCertificate, IssuedCertificate, IssuerRef, Role,
};
pub use chain::ChainBundle;
pub use config::{IssueConfig, IssueOptions};
pub use dehydrate::{
    dehydrate_cert, fill_rehydrated_template, rehydrate_cert, DehydratedCertificate,
    DehydratedRecord, RehydratedTemplate,
};
pub use error::{ErrorClass, PkiError, Result};
pub use issuance::{issue, Artifact, Issuance, NamecoinRecord};
pub use output::write_artifacts;
pub use tlsa::TlsaRecord;
pub use validity::{floor_timestamp, ValidityWindow, TIMESTAMP_PRECISION};
pub use verify::verify_round_trip;

/// Commonly used types and functions
pub mod prelude {
    pub use crate::{
        config::{IssueConfig, IssueOptions},
        error::{ErrorClass, PkiError, Result},
        issuance::{issue, Artifact, Issuance, NamecoinRecord},
        output::write_artifacts,
        validity::ValidityWindow,
    };
}
