use thiserror::Error;

/// Error type for key operations
#[derive(Error, Debug)]
pub enum Error {
    /// Neither an elliptic curve nor Ed25519 was selected
    #[error("No key algorithm selected: choose an ECDSA curve or Ed25519")]
    MissingAlgorithm,

    /// More than one key algorithm was selected
    #[error("Conflicting key algorithms selected: {0}")]
    ConflictingAlgorithm(String),

    /// Algorithm or curve name not in the supported set
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key generation or derivation failure
    #[error("Key error: {0}")]
    KeyError(String),

    /// Key import failure
    #[error("Import error: {0}")]
    ImportError(String),

    /// Key export failure
    #[error("Export error: {0}")]
    ExportError(String),

    /// Signing failure
    #[error("Signature error: {0}")]
    SignatureError(String),

    /// Signature did not verify
    #[error("Invalid signature")]
    InvalidSignature,

    /// DER/PEM encoding failure
    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl From<der::Error> for Error {
    fn from(e: der::Error) -> Self {
        Error::EncodingError(e.to_string())
    }
}

/// Result type alias for key operations
pub type Result<T> = std::result::Result<T, Error>;
