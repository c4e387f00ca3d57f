//! SCORCH Presale & Vesting
//!
//! Sells SCORCH entitlement in fixed-price phases and releases it on a
//! cliff-gated linear schedule. Released tokens are minted through the
//! [`lib_tokens::Ledger`]; the schedule itself never holds balances.
//!
//! # Key Types
//!
//! - [`VestingSchedule`]: thread-safe presale + vesting handle
//! - [`PhaseTable`] / [`Phase`]: priced tranches with a forward-only cursor
//! - [`VestingInfo`]: per-beneficiary entitlement and claimed amount
//! - [`PaymentAsset`]: the asset buyers pay with

pub mod errors;
pub mod payment;
pub mod phase;
pub mod schedule;
pub mod vesting_types;

pub use errors::{VestingError, VestingResult};
pub use payment::{
    split_payment, InMemoryPaymentAsset, PaymentAsset, PaymentAssetState, PaymentError,
    PaymentResult, PaymentSettlement,
};
pub use phase::{Phase, PhaseTable};
pub use schedule::{
    PresaleConfig, PurchaseReceipt, VestingSchedule, VestingState, DEFAULT_PAYMENT_BURN_BPS,
};
pub use vesting_types::{VestingInfo, VestingStatus, VESTING_CLIFF, VESTING_TOTAL};
