//! Vesting Errors

use lib_tokens::TokenError;
use lib_types::{Amount, ErrorKind};
use thiserror::Error;

use crate::payment::PaymentError;

/// Error during presale or vesting operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VestingError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Vesting already started at {0}")]
    AlreadyStarted(u64),

    #[error("Presale not active")]
    NotActive,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Phase {phase} exhausted: requested {requested}, remaining {remaining}")]
    PhaseExhausted {
        phase: usize,
        requested: Amount,
        remaining: Amount,
    },

    #[error("Already at the last phase ({0})")]
    LastPhase(usize),

    #[error("Nothing to claim")]
    NothingToClaim,

    #[error("Invalid phase table: {0}")]
    InvalidPhases(String),

    #[error("Invalid vesting state: {0}")]
    InvalidState(String),

    #[error("Re-entrant call rejected")]
    Reentrancy,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Ledger error: {0}")]
    Ledger(#[from] TokenError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),
}

impl VestingError {
    /// Coarse class of this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            VestingError::Unauthorized(_) => ErrorKind::Unauthorized,
            VestingError::PhaseExhausted { .. } => ErrorKind::InsufficientResource,
            VestingError::Overflow | VestingError::Underflow => ErrorKind::ArithmeticFault,
            VestingError::Ledger(inner) => inner.kind(),
            VestingError::Payment(inner) => inner.kind(),
            VestingError::AlreadyStarted(_)
            | VestingError::NotActive
            | VestingError::InvalidAmount(_)
            | VestingError::LastPhase(_)
            | VestingError::NothingToClaim
            | VestingError::InvalidPhases(_)
            | VestingError::InvalidState(_)
            | VestingError::Reentrancy => ErrorKind::InvalidState,
        }
    }
}

/// Result type for vesting operations
pub type VestingResult<T> = Result<T, VestingError>;
