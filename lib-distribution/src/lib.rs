//! SCORCH distribution
//!
//! Collaborators that create supply through the ledger's minter set:
//! one-shot [`Airdrop`]s and the recurring [`Payroll`].

pub mod airdrop;
pub mod errors;
pub mod payroll;

pub use airdrop::{Airdrop, MAX_AIRDROP_RECIPIENTS};
pub use errors::{DistributionError, DistributionResult};
pub use payroll::{
    Employee, Payroll, PayrollRun, PayrollState, PayrollTier, SalaryPayment, TierId,
    MAX_CATCH_UP_PERIODS,
};
