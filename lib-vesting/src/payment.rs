//! Payment asset used to pay for presale allocations
//!
//! The presale only relies on one contract: the payer has pre-approved the
//! presale for at least the payment amount, and a successful `collect`
//! irrevocably destroys `burn_bps` of it and forwards the rest to the
//! operations address. `collect` is all-or-nothing.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use lib_types::{Address, Amount, Bps, ErrorKind, MAX_BPS};

/// Error raised by a payment asset
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("Insufficient payment balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Burn fraction {0} bps exceeds 100%")]
    InvalidBurnFraction(Bps),

    #[error("Zero address not allowed: {0}")]
    ZeroAddress(&'static str),

    #[error("Inconsistent payment asset state: {0}")]
    InconsistentState(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::InsufficientAllowance { .. } | PaymentError::InsufficientBalance { .. } => {
                ErrorKind::InsufficientResource
            }
            PaymentError::InvalidBurnFraction(_)
            | PaymentError::ZeroAddress(_)
            | PaymentError::InconsistentState(_) => ErrorKind::InvalidState,
            PaymentError::Overflow | PaymentError::Underflow => ErrorKind::ArithmeticFault,
        }
    }
}

pub type PaymentResult<T> = Result<T, PaymentError>;

/// How a collected payment was split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettlement {
    pub burned: Amount,
    pub forwarded: Amount,
}

/// Split `amount` into the burned part (floor) and the forwarded remainder
pub fn split_payment(amount: Amount, burn_bps: Bps) -> PaymentResult<PaymentSettlement> {
    if burn_bps > MAX_BPS {
        return Err(PaymentError::InvalidBurnFraction(burn_bps));
    }
    let burned = amount
        .checked_mul(burn_bps as Amount)
        .ok_or(PaymentError::Overflow)?
        / MAX_BPS as Amount;
    Ok(PaymentSettlement {
        burned,
        forwarded: amount - burned,
    })
}

/// External asset accepted as payment by the presale
pub trait PaymentAsset: Send + Sync {
    fn balance_of(&self, owner: &Address) -> Amount;

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Pull `amount` from `payer` using `spender`'s allowance, burn
    /// `burn_bps` of it and forward the remainder to `operations`.
    fn collect(
        &self,
        payer: &Address,
        spender: &Address,
        amount: Amount,
        burn_bps: Bps,
        operations: &Address,
    ) -> PaymentResult<PaymentSettlement>;
}

// =============================================================================
// IN-MEMORY ASSET
// =============================================================================

/// Serializable state of [`InMemoryPaymentAsset`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentAssetState {
    balances: BTreeMap<Address, Amount>,
    /// owner -> spender -> remaining allowance
    allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
    total_supply: Amount,
    total_burned: Amount,
}

impl PaymentAssetState {
    /// Balances must add up to the supply
    pub fn validate(&self) -> PaymentResult<()> {
        let mut sum: Amount = 0;
        for balance in self.balances.values() {
            sum = sum.checked_add(*balance).ok_or(PaymentError::Overflow)?;
        }
        if sum != self.total_supply {
            return Err(PaymentError::InconsistentState(format!(
                "balances sum to {} but total supply is {}",
                sum, self.total_supply
            )));
        }
        Ok(())
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn set_balance(&mut self, owner: Address, amount: Amount) {
        if amount == 0 {
            self.balances.remove(&owner);
        } else {
            self.balances.insert(owner, amount);
        }
    }
}

/// Simple fungible asset with allowances, used as the presale currency by
/// the CLI and in tests
#[derive(Debug, Default)]
pub struct InMemoryPaymentAsset {
    state: RwLock<PaymentAssetState>,
}

impl InMemoryPaymentAsset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a snapshot, rejecting one whose balances and supply
    /// disagree
    pub fn from_state(state: PaymentAssetState) -> PaymentResult<Self> {
        state.validate()?;
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    pub fn snapshot(&self) -> PaymentAssetState {
        self.state.read().clone()
    }

    /// Credit `to` with freshly issued payment tokens
    pub fn mint_to(&self, to: Address, amount: Amount) -> PaymentResult<()> {
        if to.is_zero() {
            return Err(PaymentError::ZeroAddress("payment recipient"));
        }
        let mut state = self.state.write();
        let balance = state
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(PaymentError::Overflow)?;
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(PaymentError::Overflow)?;
        state.set_balance(to, balance);
        state.total_supply = supply;
        Ok(())
    }

    /// Set `spender`'s allowance over `owner`'s balance
    pub fn approve(&self, owner: Address, spender: Address, amount: Amount) -> PaymentResult<()> {
        if owner.is_zero() || spender.is_zero() {
            return Err(PaymentError::ZeroAddress("approval party"));
        }
        let mut state = self.state.write();
        state.allowances.entry(owner).or_default().insert(spender, amount);
        Ok(())
    }

    pub fn total_supply(&self) -> Amount {
        self.state.read().total_supply
    }

    pub fn total_burned(&self) -> Amount {
        self.state.read().total_burned
    }
}

impl PaymentAsset for InMemoryPaymentAsset {
    fn balance_of(&self, owner: &Address) -> Amount {
        self.state.read().balance_of(owner)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.state.read().allowance(owner, spender)
    }

    fn collect(
        &self,
        payer: &Address,
        spender: &Address,
        amount: Amount,
        burn_bps: Bps,
        operations: &Address,
    ) -> PaymentResult<PaymentSettlement> {
        if operations.is_zero() {
            return Err(PaymentError::ZeroAddress("operations"));
        }
        let settlement = split_payment(amount, burn_bps)?;
        let mut state = self.state.write();

        let allowance = state.allowance(payer, spender);
        if allowance < amount {
            return Err(PaymentError::InsufficientAllowance {
                have: allowance,
                need: amount,
            });
        }
        let balance = state.balance_of(payer);
        if balance < amount {
            return Err(PaymentError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }

        let ops_base = if operations == payer {
            balance - amount
        } else {
            state.balance_of(operations)
        };
        let ops_balance = ops_base
            .checked_add(settlement.forwarded)
            .ok_or(PaymentError::Overflow)?;
        let burned_total = state
            .total_burned
            .checked_add(settlement.burned)
            .ok_or(PaymentError::Overflow)?;
        let supply = state
            .total_supply
            .checked_sub(settlement.burned)
            .ok_or(PaymentError::Underflow)?;

        state.set_balance(*payer, balance - amount);
        state.set_balance(*operations, ops_balance);
        state.total_supply = supply;
        state.total_burned = burned_total;
        state
            .allowances
            .entry(*payer)
            .or_default()
            .insert(*spender, allowance - amount);

        info!(
            payer = %payer,
            amount,
            burned = settlement.burned,
            forwarded = settlement.forwarded,
            "payment collected"
        );
        Ok(settlement)
    }
}
