//! Vesting Types
//!
//! Per-beneficiary entitlement records and the release curve.
//!
//! # Vesting Model
//!
//! Every entitlement shares one global start time. Tokens vest linearly from
//! the start over `VESTING_TOTAL`, but nothing is releasable before the
//! cliff:
//!
//! ```text
//! |----cliff (90d)----|--------linear vesting--------|
//! ^                   ^                              ^
//! start               start + cliff                  start + 365d
//! ```
//!
//! - Before cliff: 0 releasable
//! - At cliff: everything vested since start becomes releasable at once
//! - At or after end: the full remainder is releasable
//!
//! All calculations use integer math only. No floating point.

use serde::{Deserialize, Serialize};

use lib_types::{Amount, Timestamp, SECONDS_PER_DAY};

use crate::errors::{VestingError, VestingResult};

/// Cliff before anything is releasable
pub const VESTING_CLIFF: u64 = 90 * SECONDS_PER_DAY;

/// Time from start until the full entitlement has vested
pub const VESTING_TOTAL: u64 = 365 * SECONDS_PER_DAY;

/// Entitlement of one beneficiary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingInfo {
    /// Accrued through presale purchases
    pub total_amount: Amount,
    /// Already minted to the beneficiary (never above `total_amount`)
    pub claimed_amount: Amount,
}

impl VestingInfo {
    /// Amount vested at `now` for a schedule that started at `start`
    pub fn vested_amount(&self, start: Timestamp, now: Timestamp) -> VestingResult<Amount> {
        if now < start {
            return Ok(0);
        }
        let elapsed = now - start;
        if elapsed >= VESTING_TOTAL {
            return Ok(self.total_amount);
        }
        // u128 headroom: total <= 1.5e28, elapsed < 3.2e7
        let vested = self
            .total_amount
            .checked_mul(elapsed as Amount)
            .ok_or(VestingError::Overflow)?
            / VESTING_TOTAL as Amount;
        Ok(vested)
    }

    /// Amount that can be claimed at `now`
    ///
    /// `start == None` means vesting has not started.
    pub fn releasable_amount(&self, start: Option<Timestamp>, now: Timestamp) -> VestingResult<Amount> {
        let Some(start) = start else {
            return Ok(0);
        };
        if now < start.saturating_add(VESTING_CLIFF) {
            return Ok(0);
        }
        let remaining = self
            .total_amount
            .checked_sub(self.claimed_amount)
            .ok_or(VestingError::Underflow)?;
        if now.saturating_sub(start) >= VESTING_TOTAL {
            return Ok(remaining);
        }
        Ok(self
            .vested_amount(start, now)?
            .saturating_sub(self.claimed_amount))
    }

    /// Remaining locked (unclaimed) entitlement
    pub fn remaining(&self) -> Amount {
        self.total_amount.saturating_sub(self.claimed_amount)
    }

    pub fn is_complete(&self) -> bool {
        self.total_amount > 0 && self.claimed_amount >= self.total_amount
    }
}

/// Lifecycle of the global vesting clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VestingStatus {
    /// `start` has not been called
    NotStarted,
    /// Started; stays here indefinitely
    Active,
}

impl std::fmt::Display for VestingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "Not started"),
            Self::Active => write!(f, "Active"),
        }
    }
}
