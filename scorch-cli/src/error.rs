//! Structured error types for the SCORCH CLI

use std::path::PathBuf;

use lib_distribution::DistributionError;
use lib_tokens::TokenError;
use lib_types::ErrorKind;
use lib_vesting::{PaymentError, VestingError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    // Configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to load config from {path}: {reason}")]
    ConfigLoadFailed { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // State file
    #[error("No state at {0}; run `scorch-cli init` first")]
    StateNotFound(PathBuf),

    #[error("State already exists at {0}; pass --force to overwrite")]
    StateExists(PathBuf),

    #[error("Failed to load state from {path}: {reason}")]
    StateLoadFailed { path: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    // Engine
    #[error("Ledger rejected operation: {0}")]
    Token(#[from] TokenError),

    #[error("Presale rejected operation: {0}")]
    Vesting(#[from] VestingError),

    #[error("Payment asset rejected operation: {0}")]
    Payment(#[from] PaymentError),

    #[error("Distribution rejected operation: {0}")]
    Distribution(#[from] DistributionError),

    // I/O operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // Serialization
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl CliError {
    /// Engine error class, if this error came from one of the libraries
    /// or from an access check
    pub fn engine_kind(&self) -> Option<ErrorKind> {
        match self {
            CliError::Unauthorized(_) => Some(ErrorKind::Unauthorized),
            CliError::Token(e) => Some(e.kind()),
            CliError::Vesting(e) => Some(e.kind()),
            CliError::Payment(e) => Some(e.kind()),
            CliError::Distribution(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl From<String> for CliError {
    fn from(s: String) -> Self {
        CliError::Other(s)
    }
}

impl From<&str> for CliError {
    fn from(s: &str) -> Self {
        CliError::Other(s.to_string())
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_not_found_mentions_init() {
        let err = CliError::StateNotFound(PathBuf::from("/tmp/scorch.json"));
        assert!(err.to_string().contains("scorch-cli init"));
        assert!(err.to_string().contains("/tmp/scorch.json"));
    }

    #[test]
    fn test_engine_kind_passthrough() {
        let err: CliError = VestingError::NothingToClaim.into();
        assert_eq!(err.engine_kind(), Some(ErrorKind::InvalidState));

        let err: CliError = TokenError::Unauthorized("x".into()).into();
        assert_eq!(err.engine_kind(), Some(ErrorKind::Unauthorized));

        assert_eq!(
            CliError::Unauthorized("x".into()).engine_kind(),
            Some(ErrorKind::Unauthorized)
        );
        assert_eq!(CliError::Other("x".into()).engine_kind(), None);
    }
}
