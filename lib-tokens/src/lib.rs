//! SCORCH Ledger
//!
//! Balance and supply accounting for the SCORCH token: a hard supply cap,
//! a minter set managed by a single fixed admin, and a 1% transfer tax that
//! is destroyed rather than redirected.
//!
//! # Key Types
//!
//! - [`LedgerState`]: single-threaded accounting core (serializable)
//! - [`Ledger`]: thread-safe handle with event delivery
//! - [`LedgerEvent`] / [`EventSink`]: committed state changes
//!
//! # Invariants
//!
//! `sum(balances) == total_supply <= MAX_SUPPLY` after every operation.
//! Use [`apply_transfer`] (or [`Ledger::transfer`]) to move tokens.

pub mod contract;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod transfer;

pub use contract::*;
pub use errors::*;
pub use events::{EventLog, EventSeq, EventSink, LedgerEvent};
pub use ledger::Ledger;
pub use transfer::{apply_transfer, TransferResult};
