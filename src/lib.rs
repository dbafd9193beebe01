//! # nmcert
//!
//! Namecoin TLS certificate generator
//!
//! ## Crates
//!
//! - `nmcert_key` - key generation, import/export and signing
//! - `nmcert_pki` - certificate templates, dehydration, chains and AIA
//!
//! The `nmcert` binary lives in `crates/nmcert-cli`.

// Re-export all sub-crates
pub use nmcert_key;
pub use nmcert_pki;
