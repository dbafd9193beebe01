pub mod cert_utils;
pub mod false_host;
pub mod template;
pub mod types;

// Re-export commonly used types and functions
pub use cert_utils::{
    assemble, build_unsigned, parse_first_certificate, random_serial_number,
    self_sign_certificate, sign_certificate, verify_signature,
};
pub use false_host::{issue_false_certificate, FalseCertificate};
pub use template::{key_identifier, CertificateTemplate, Role, SUBJECT_SERIAL_NUMBER};
pub use types::{subject_key_identifier, IssuedCertificate, IssuerRef};
