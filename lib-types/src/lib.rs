//! SCORCH primitives.
//! Stable, behavior-free building blocks shared by the ledger, vesting and
//! distribution crates.
//!
//! Rule: all token quantities are integer base units. No floats. Ever.

pub mod primitives;
pub mod errors;
pub mod time;

pub use primitives::{
    Address, AddressParseError, Amount, Bps, Timestamp, BASE_UNITS_PER_TOKEN, MAX_BPS,
    TOKEN_DECIMALS,
};
pub use errors::ErrorKind;
pub use time::{Clock, ManualClock, SystemClock, SECONDS_PER_DAY};
