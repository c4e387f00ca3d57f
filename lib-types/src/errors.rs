//! Error classification shared by every SCORCH crate.
//!
//! Each crate keeps its own error enum; `ErrorKind` is the coarse bucket
//! callers use to decide what to do about a failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Caller lacks the required role. Never retried.
    Unauthorized,
    /// Operation attempted in the wrong state, or with malformed arguments.
    InvalidState,
    /// Balance, supply headroom, capacity or allowance exhausted.
    InsufficientResource,
    /// Checked arithmetic would have overflowed or underflowed.
    ArithmeticFault,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::InvalidState => write!(f, "invalid state"),
            Self::InsufficientResource => write!(f, "insufficient resource"),
            Self::ArithmeticFault => write!(f, "arithmetic fault"),
        }
    }
}
