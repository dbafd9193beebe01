use std::path::PathBuf;

use thiserror::Error;

/// Error type for certificate issuance
#[derive(Error, Debug)]
pub enum PkiError {
    /// No hostname was supplied
    #[error("Missing required hostname")]
    MissingHostname,

    /// Missing or contradictory options
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Key generation, import or signing failure
    #[error("Crypto error: {0}")]
    CryptoError(#[from] nmcert_key::Error),

    /// Certificate signing failure
    #[error("Signing error: {0}")]
    SigningError(String),

    /// File open/read/write/close failure
    #[error("IO error on {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dehydration/rehydration failure
    #[error("Codec error: {0}")]
    CodecError(String),

    /// DER encoding/decoding failure
    #[error("Encoding error: {0}")]
    EncodingError(#[from] der::Error),

    /// JSON failure
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Rehydrated bytes differ from the issued certificate
    #[error("Dehydrated certificate did not round-trip to identical DER; do not use the generated certificate")]
    RoundTripIntegrityError,
}

/// Error classes reported to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Crypto,
    Io,
    Codec,
    RoundTripIntegrity,
}

impl PkiError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PkiError::MissingHostname | PkiError::ConfigError(_) => ErrorClass::Configuration,
            PkiError::CryptoError(_) | PkiError::SigningError(_) => ErrorClass::Crypto,
            PkiError::IoError { .. } => ErrorClass::Io,
            PkiError::CodecError(_)
            | PkiError::EncodingError(_)
            | PkiError::SerializationError(_) => ErrorClass::Codec,
            PkiError::RoundTripIntegrityError => ErrorClass::RoundTripIntegrity,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PkiError::IoError {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PkiError>;
