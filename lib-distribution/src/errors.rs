//! Distribution Errors

use lib_tokens::TokenError;
use lib_types::{Address, ErrorKind};
use thiserror::Error;

/// Error during airdrop or payroll operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Recipient list is empty")]
    EmptyRecipients,

    #[error("Too many recipients: {count} > {max}")]
    TooManyRecipients { count: usize, max: usize },

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Tier {0} already exists")]
    DuplicateTier(u32),

    #[error("Invalid tier: {0}")]
    InvalidTier(String),

    #[error("Unknown tier {0}")]
    UnknownTier(u32),

    #[error("Tier {tier} still has {employees} employee(s)")]
    TierInUse { tier: u32, employees: usize },

    #[error("Employee {0} already registered")]
    DuplicateEmployee(Address),

    #[error("Unknown employee {0}")]
    UnknownEmployee(Address),

    #[error("Re-entrant call rejected")]
    Reentrancy,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Ledger error: {0}")]
    Ledger(#[from] TokenError),
}

impl DistributionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DistributionError::Unauthorized(_) => ErrorKind::Unauthorized,
            DistributionError::Overflow => ErrorKind::ArithmeticFault,
            DistributionError::Ledger(inner) => inner.kind(),
            DistributionError::EmptyRecipients
            | DistributionError::TooManyRecipients { .. }
            | DistributionError::InvalidRecipient(_)
            | DistributionError::DuplicateTier(_)
            | DistributionError::InvalidTier(_)
            | DistributionError::UnknownTier(_)
            | DistributionError::TierInUse { .. }
            | DistributionError::DuplicateEmployee(_)
            | DistributionError::UnknownEmployee(_)
            | DistributionError::Reentrancy => ErrorKind::InvalidState,
        }
    }
}

pub type DistributionResult<T> = Result<T, DistributionError>;
