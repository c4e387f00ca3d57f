//! Token Transfer Execution
//!
//! The `apply_transfer` function is the canonical way to move tokens
//! between accounts. Debit, credit and supply reduction happen in one call
//! so that no caller can observe or interleave a partial transfer.

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount};

use crate::contract::{compute_tax, LedgerState};
use crate::errors::{TokenError, TokenResult};
use crate::events::LedgerEvent;

/// Result of a successful transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    /// Amount credited to the recipient
    pub amount: Amount,
    /// Amount destroyed as tax
    pub tax: Amount,
    /// Total debited from the sender
    pub total_debit: Amount,
}

impl TransferResult {
    fn noop() -> Self {
        Self {
            amount: 0,
            tax: 0,
            total_debit: 0,
        }
    }
}

/// Apply a transfer with full validation
///
/// # Enforcement
///
/// - **Zero amount**: no-op success
/// - **Zero-address legs**: `from == zero` is rejected (minting goes through
///   `mint`); `to == zero` is an untaxed burn of `amount`
/// - **Tax**: `floor(amount / 100)` is debited on top of `amount` and destroyed
/// - **Conservation**: sender_debit == amount + tax, supply drops by tax
///
/// # Returns
///
/// * `Ok(TransferResult)` - Transfer details on success
/// * `Err(TokenError)` - Error describing failure; state is untouched
pub fn apply_transfer(
    state: &mut LedgerState,
    from: Address,
    to: Address,
    amount: Amount,
) -> TokenResult<TransferResult> {
    // =========================================================================
    // Check 1: Amount > 0
    // =========================================================================
    if amount == 0 {
        return Ok(TransferResult::noop());
    }

    // =========================================================================
    // Check 2: Zero-address legs bypass the tax path
    // =========================================================================
    if from.is_zero() {
        return Err(TokenError::ZeroAddress("transfer source"));
    }
    if to.is_zero() {
        state.burn(&from, amount)?;
        return Ok(TransferResult {
            amount: 0,
            tax: 0,
            total_debit: amount,
        });
    }

    // =========================================================================
    // Compute tax
    // =========================================================================
    let tax = compute_tax(amount)?;
    let total_debit = amount.checked_add(tax).ok_or(TokenError::Overflow)?;

    // =========================================================================
    // Check 3: Sufficient balance
    // =========================================================================
    let from_balance = state.balance_of(&from);
    if from_balance < total_debit {
        return Err(TokenError::InsufficientBalance {
            have: from_balance,
            need: total_debit,
        });
    }

    // =========================================================================
    // Stage new values
    // =========================================================================
    let new_from_balance = from_balance
        .checked_sub(total_debit)
        .ok_or(TokenError::Underflow)?;
    // Self-transfer: the credit lands on the already-debited balance
    let to_base = if to == from {
        new_from_balance
    } else {
        state.balance_of(&to)
    };
    let new_to_balance = to_base.checked_add(amount).ok_or(TokenError::Overflow)?;
    let new_supply = state
        .total_supply()
        .checked_sub(tax)
        .ok_or(TokenError::Underflow)?;
    let new_burned = state
        .total_burned()
        .checked_add(tax)
        .ok_or(TokenError::Overflow)?;

    // =========================================================================
    // Apply state transitions
    // =========================================================================
    state.set_balance(from, new_from_balance);
    state.set_balance(to, new_to_balance);
    state.set_supply(new_supply, new_burned);

    state.emit(LedgerEvent::Transferred { from, to, amount });
    if tax > 0 {
        state.emit(LedgerEvent::TaxBurned {
            from,
            to,
            amount,
            tax,
        });
    }

    Ok(TransferResult {
        amount,
        tax,
        total_debit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MAX_SUPPLY;
    use lib_types::{ErrorKind, BASE_UNITS_PER_TOKEN};

    const TOKEN: Amount = BASE_UNITS_PER_TOKEN;

    fn admin() -> Address {
        Address::repeat(0xAA)
    }

    fn minter() -> Address {
        Address::repeat(0xBB)
    }

    fn create_funded_state(holder: Address, amount: Amount) -> LedgerState {
        let mut state = LedgerState::new(admin(), Address::repeat(0x5C)).unwrap();
        state.add_minter(&admin(), minter()).unwrap();
        state.mint(&minter(), holder, amount).unwrap();
        state.take_events();
        state
    }

    #[test]
    fn test_transfer_scenario_1000_then_100() {
        let a = Address::repeat(1);
        let b = Address::repeat(2);
        let mut state = create_funded_state(a, 1_000 * TOKEN);

        let result = apply_transfer(&mut state, a, b, 100 * TOKEN).unwrap();

        assert_eq!(result.tax, TOKEN);
        assert_eq!(result.total_debit, 101 * TOKEN);
        assert_eq!(state.balance_of(&b), 100 * TOKEN);
        assert_eq!(state.balance_of(&a), 899 * TOKEN);
        assert_eq!(state.total_supply(), 999 * TOKEN);
        assert_eq!(state.total_burned(), TOKEN);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_smallest_unit_pays_no_tax() {
        let a = Address::repeat(1);
        let b = Address::repeat(2);
        let mut state = create_funded_state(a, 10);

        let result = apply_transfer(&mut state, a, b, 1).unwrap();
        assert_eq!(result.tax, 0);
        assert_eq!(state.total_supply(), 10);

        let events = state.take_events();
        assert!(events.iter().all(|e| !matches!(e, LedgerEvent::TaxBurned { .. })));
    }

    #[test]
    fn test_tax_burned_event_carries_details() {
        let a = Address::repeat(1);
        let b = Address::repeat(2);
        let mut state = create_funded_state(a, 1_000);

        apply_transfer(&mut state, a, b, 500).unwrap();
        let events = state.take_events();
        assert!(events.contains(&LedgerEvent::TaxBurned {
            from: a,
            to: b,
            amount: 500,
            tax: 5,
        }));
    }

    #[test]
    fn test_zero_amount_is_noop() {
        let a = Address::repeat(1);
        let mut state = create_funded_state(a, 10);

        let result = apply_transfer(&mut state, a, Address::repeat(2), 0).unwrap();
        assert_eq!(result.total_debit, 0);
        assert_eq!(state.balance_of(&a), 10);
        assert!(state.take_events().is_empty());
    }

    #[test]
    fn test_insufficient_balance_counts_tax() {
        let a = Address::repeat(1);
        let b = Address::repeat(2);
        // Enough for the amount but not the tax on top
        let mut state = create_funded_state(a, 100 * TOKEN);

        let err = apply_transfer(&mut state, a, b, 100 * TOKEN).unwrap_err();
        assert_eq!(
            err,
            TokenError::InsufficientBalance {
                have: 100 * TOKEN,
                need: 101 * TOKEN,
            }
        );
        assert_eq!(err.kind(), ErrorKind::InsufficientResource);
        assert_eq!(state.balance_of(&a), 100 * TOKEN);
        assert_eq!(state.balance_of(&b), 0);
        assert_eq!(state.total_supply(), 100 * TOKEN);
    }

    #[test]
    fn test_transfer_to_zero_burns_without_tax() {
        let a = Address::repeat(1);
        let mut state = create_funded_state(a, 1_000);

        let result = apply_transfer(&mut state, a, Address::zero(), 500).unwrap();
        assert_eq!(result.tax, 0);
        assert_eq!(state.balance_of(&a), 500);
        assert_eq!(state.total_supply(), 500);
        assert_eq!(state.total_burned(), 500);
    }

    #[test]
    fn test_transfer_from_zero_rejected() {
        let mut state = create_funded_state(Address::repeat(1), 1_000);
        let result = apply_transfer(&mut state, Address::zero(), Address::repeat(2), 5);
        assert!(matches!(result, Err(TokenError::ZeroAddress(_))));
    }

    #[test]
    fn test_self_transfer_only_burns_tax() {
        let a = Address::repeat(1);
        let mut state = create_funded_state(a, 1_000);

        apply_transfer(&mut state, a, a, 500).unwrap();
        assert_eq!(state.balance_of(&a), 995);
        assert_eq!(state.total_supply(), 995);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_transfer_at_full_cap() {
        let a = Address::repeat(1);
        let b = Address::repeat(2);
        let mut state = create_funded_state(a, MAX_SUPPLY);

        let amount = MAX_SUPPLY / 2;
        let result = apply_transfer(&mut state, a, b, amount).unwrap();
        assert_eq!(result.tax, amount / 100);
        state.check_invariants().unwrap();
    }
}
