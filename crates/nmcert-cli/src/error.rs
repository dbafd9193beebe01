use nmcert_pki::{ErrorClass, PkiError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Pki(#[from] PkiError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CliError {
    /// True when the run produced certificates that must not be used
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, CliError::Pki(e) if e.class() == ErrorClass::RoundTripIntegrity)
    }
}

pub type CliResult<T> = Result<T, CliError>;
