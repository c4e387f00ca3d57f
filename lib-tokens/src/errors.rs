//! Ledger Errors

use lib_types::{Address, Amount, ErrorKind};
use thiserror::Error;

/// Error during ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Supply cap exceeded: max {max}, would have {would_have}")]
    SupplyCapExceeded { max: Amount, would_have: Amount },

    #[error("Zero address not allowed: {0}")]
    ZeroAddress(&'static str),

    #[error("Nothing to withdraw from {0}")]
    NothingToWithdraw(Address),

    #[error("Empty batch")]
    EmptyBatch,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Conservation invariant violated: {0}")]
    ConservationViolated(String),
}

impl TokenError {
    /// Coarse class of this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenError::Unauthorized(_) => ErrorKind::Unauthorized,
            TokenError::InsufficientBalance { .. }
            | TokenError::SupplyCapExceeded { .. }
            | TokenError::NothingToWithdraw(_) => ErrorKind::InsufficientResource,
            TokenError::ZeroAddress(_)
            | TokenError::EmptyBatch
            | TokenError::ConservationViolated(_) => ErrorKind::InvalidState,
            TokenError::Overflow | TokenError::Underflow => ErrorKind::ArithmeticFault,
        }
    }
}

/// Result type for ledger operations
pub type TokenResult<T> = Result<T, TokenError>;
