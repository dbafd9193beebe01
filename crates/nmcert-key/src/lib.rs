//! Key algebra for Namecoin certificates
//!
//! A closed set of key algorithms (NIST P-224, P-256, P-384, P-521 and
//! Ed25519) behind one [`KeyPair`] enum, with PKCS#8 import/export and the
//! signature algorithm registry used by the certificate codec.

pub mod error;
pub mod key;
pub mod signature;

pub use error::{Error, Result};
pub use key::{Algorithm, KeyPair};
pub use signature::{PublicKey, SignatureAlgorithm};
