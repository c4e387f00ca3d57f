//! Ledger state
//!
//! `LedgerState` is the plain, single-threaded accounting core. Every
//! mutating method is all-or-nothing: new values are computed with checked
//! arithmetic first and written only once every check has passed. The
//! thread-safe wrapper lives in [`crate::ledger`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use lib_types::{Address, Amount, BASE_UNITS_PER_TOKEN, TOKEN_DECIMALS};

use crate::errors::{TokenError, TokenResult};
use crate::events::LedgerEvent;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Hard supply cap: 15 billion tokens in base units
pub const MAX_SUPPLY: Amount = 15_000_000_000 * BASE_UNITS_PER_TOKEN;

/// Transfer tax numerator (1/100 = 1%)
pub const TAX_NUMERATOR: Amount = 1;

/// Transfer tax denominator
pub const TAX_DENOMINATOR: Amount = 100;

pub const TOKEN_NAME: &str = "Scorch";
pub const TOKEN_SYMBOL: &str = "SCORCH";

/// Tax owed on a transfer of `amount`
///
/// Floor division: a transfer of 99 base units or less pays no tax.
pub fn compute_tax(amount: Amount) -> TokenResult<Amount> {
    amount
        .checked_mul(TAX_NUMERATOR)
        .map(|v| v / TAX_DENOMINATOR)
        .ok_or(TokenError::Overflow)
}

// =============================================================================
// ROLE & AUTHORITY
// =============================================================================

/// Role enumeration for authority checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Manages the minter set and the stuck-token rescue
    Admin,
    /// May mint up to the supply cap
    Minter,
}

/// Explicitly owned authority set
///
/// The admin is fixed at construction. Minters are granted and revoked by
/// the admin only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    admin: Address,
    minters: BTreeSet<Address>,
}

impl Roles {
    pub fn new(admin: Address) -> TokenResult<Self> {
        if admin.is_zero() {
            return Err(TokenError::ZeroAddress("admin"));
        }
        Ok(Self {
            admin,
            minters: BTreeSet::new(),
        })
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Check if an address has a role
    pub fn has_role(&self, role: Role, address: &Address) -> bool {
        match role {
            Role::Admin => &self.admin == address,
            Role::Minter => self.minters.contains(address),
        }
    }

    /// Returns true when the set changed
    pub fn add_minter(&mut self, address: Address) -> bool {
        self.minters.insert(address)
    }

    /// Returns true when the set changed
    pub fn remove_minter(&mut self, address: &Address) -> bool {
        self.minters.remove(address)
    }

    pub fn minters(&self) -> impl Iterator<Item = &Address> {
        self.minters.iter()
    }
}

// =============================================================================
// LEDGER STATE
// =============================================================================

/// Balances, supply and roles of the SCORCH token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerState {
    /// Human-readable token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Number of decimal places (display only)
    pub decimals: u8,
    /// Address of the ledger itself. Tokens sent here are "stuck" until
    /// the admin withdraws them.
    pub self_address: Address,
    roles: Roles,
    /// Non-zero balances only
    balances: BTreeMap<Address, Amount>,
    total_supply: Amount,
    total_burned: Amount,
    /// Events produced by the last committed operation, drained by the
    /// thread-safe wrapper once its lock is released
    #[serde(skip)]
    pending_events: Vec<LedgerEvent>,
}

impl LedgerState {
    /// Create an empty ledger with a fixed admin
    pub fn new(admin: Address, self_address: Address) -> TokenResult<Self> {
        if self_address.is_zero() {
            return Err(TokenError::ZeroAddress("ledger address"));
        }
        Ok(Self {
            name: TOKEN_NAME.to_string(),
            symbol: TOKEN_SYMBOL.to_string(),
            decimals: TOKEN_DECIMALS,
            self_address,
            roles: Roles::new(admin)?,
            balances: BTreeMap::new(),
            total_supply: 0,
            total_burned: 0,
            pending_events: Vec::new(),
        })
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn total_burned(&self) -> Amount {
        self.total_burned
    }

    pub fn admin(&self) -> Address {
        self.roles.admin()
    }

    pub fn is_minter(&self, address: &Address) -> bool {
        self.roles.has_role(Role::Minter, address)
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    /// Remaining headroom under the cap
    pub fn mintable_supply(&self) -> Amount {
        MAX_SUPPLY.saturating_sub(self.total_supply)
    }

    /// Accounts with a non-zero balance, in address order
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Verify `sum(balances) == total_supply <= MAX_SUPPLY`
    pub fn check_invariants(&self) -> TokenResult<()> {
        let mut sum: Amount = 0;
        for amount in self.balances.values() {
            sum = sum.checked_add(*amount).ok_or(TokenError::Overflow)?;
        }
        if sum != self.total_supply {
            return Err(TokenError::ConservationViolated(format!(
                "sum of balances ({}) != total supply ({})",
                sum, self.total_supply
            )));
        }
        if self.total_supply > MAX_SUPPLY {
            return Err(TokenError::SupplyCapExceeded {
                max: MAX_SUPPLY,
                would_have: self.total_supply,
            });
        }
        Ok(())
    }

    pub(crate) fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub(crate) fn emit(&mut self, event: LedgerEvent) {
        self.pending_events.push(event);
    }

    /// Write a balance, pruning zero entries
    pub(crate) fn set_balance(&mut self, address: Address, amount: Amount) {
        if amount == 0 {
            self.balances.remove(&address);
        } else {
            self.balances.insert(address, amount);
        }
    }

    pub(crate) fn set_supply(&mut self, total_supply: Amount, total_burned: Amount) {
        self.total_supply = total_supply;
        self.total_burned = total_burned;
    }

    // ─── Authorization ──────────────────────────────────────────────────────

    fn verify_admin(&self, caller: &Address) -> TokenResult<()> {
        if !self.roles.has_role(Role::Admin, caller) {
            return Err(TokenError::Unauthorized(format!("{} is not the admin", caller)));
        }
        Ok(())
    }

    fn verify_minter(&self, caller: &Address) -> TokenResult<()> {
        if !self.roles.has_role(Role::Minter, caller) {
            return Err(TokenError::Unauthorized(format!("{} is not a minter", caller)));
        }
        Ok(())
    }

    // ─── Role Management ────────────────────────────────────────────────────

    /// Grant the minter role. Idempotent.
    pub fn add_minter(&mut self, caller: &Address, minter: Address) -> TokenResult<bool> {
        self.verify_admin(caller)?;
        if minter.is_zero() {
            return Err(TokenError::ZeroAddress("minter"));
        }
        let changed = self.roles.add_minter(minter);
        if changed {
            self.emit(LedgerEvent::MinterAdded { minter });
        }
        Ok(changed)
    }

    /// Revoke the minter role. Removing a non-minter is a no-op.
    pub fn remove_minter(&mut self, caller: &Address, minter: &Address) -> TokenResult<bool> {
        self.verify_admin(caller)?;
        let changed = self.roles.remove_minter(minter);
        if changed {
            self.emit(LedgerEvent::MinterRemoved { minter: *minter });
        }
        Ok(changed)
    }

    // ─── Issuance ───────────────────────────────────────────────────────────

    /// Mint `amount` to `to`. No tax applies.
    pub fn mint(&mut self, caller: &Address, to: Address, amount: Amount) -> TokenResult<()> {
        self.mint_batch(caller, &[(to, amount)]).map(|_| ())
    }

    /// Mint to several recipients as one unit
    ///
    /// Either every credit lands or none does. Returns the total minted.
    pub fn mint_batch(
        &mut self,
        caller: &Address,
        recipients: &[(Address, Amount)],
    ) -> TokenResult<Amount> {
        self.verify_minter(caller)?;
        if recipients.is_empty() {
            return Err(TokenError::EmptyBatch);
        }

        // Stage every credit before touching state
        let mut staged: BTreeMap<Address, Amount> = BTreeMap::new();
        let mut total: Amount = 0;
        for (to, amount) in recipients {
            if to.is_zero() {
                return Err(TokenError::ZeroAddress("mint recipient"));
            }
            if *amount == 0 {
                continue;
            }
            total = total.checked_add(*amount).ok_or(TokenError::Overflow)?;
            let current = match staged.get(to) {
                Some(v) => *v,
                None => self.balance_of(to),
            };
            let credited = current.checked_add(*amount).ok_or(TokenError::Overflow)?;
            staged.insert(*to, credited);
        }

        let new_supply = self
            .total_supply
            .checked_add(total)
            .ok_or(TokenError::Overflow)?;
        if new_supply > MAX_SUPPLY {
            return Err(TokenError::SupplyCapExceeded {
                max: MAX_SUPPLY,
                would_have: new_supply,
            });
        }

        // Commit
        for (to, balance) in staged {
            self.set_balance(to, balance);
        }
        self.total_supply = new_supply;
        for (to, amount) in recipients.iter().filter(|(_, a)| *a > 0) {
            self.emit(LedgerEvent::Minted {
                minter: *caller,
                to: *to,
                amount: *amount,
            });
        }
        Ok(total)
    }

    // ─── Burning ────────────────────────────────────────────────────────────

    /// Destroy `amount` from `holder` without tax
    pub fn burn(&mut self, holder: &Address, amount: Amount) -> TokenResult<()> {
        if holder.is_zero() {
            return Err(TokenError::ZeroAddress("burn holder"));
        }
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balance_of(holder);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }
        let new_balance = balance.checked_sub(amount).ok_or(TokenError::Underflow)?;
        let new_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(TokenError::Underflow)?;
        let new_burned = self
            .total_burned
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.set_balance(*holder, new_balance);
        self.set_supply(new_supply, new_burned);
        self.emit(LedgerEvent::Burned {
            holder: *holder,
            amount,
        });
        Ok(())
    }

    // ─── Rescue ─────────────────────────────────────────────────────────────

    /// Move every token parked at the ledger's own address to `to`
    ///
    /// Untaxed: the tokens never entered circulation through a transfer the
    /// holder intended.
    pub fn withdraw_stuck(&mut self, caller: &Address, to: Address) -> TokenResult<Amount> {
        self.verify_admin(caller)?;
        if to.is_zero() {
            return Err(TokenError::ZeroAddress("withdraw recipient"));
        }
        let stuck = self.balance_of(&self.self_address);
        if stuck == 0 {
            return Err(TokenError::NothingToWithdraw(self.self_address));
        }
        if to == self.self_address {
            return Ok(stuck);
        }
        let credited = self
            .balance_of(&to)
            .checked_add(stuck)
            .ok_or(TokenError::Overflow)?;

        let from = self.self_address;
        self.set_balance(from, 0);
        self.set_balance(to, credited);
        self.emit(LedgerEvent::StuckWithdrawn { to, amount: stuck });
        Ok(stuck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Address {
        Address::repeat(0xAA)
    }

    fn minter() -> Address {
        Address::repeat(0xBB)
    }

    fn ledger_address() -> Address {
        Address::repeat(0x5C)
    }

    fn create_test_state() -> LedgerState {
        let mut state = LedgerState::new(admin(), ledger_address()).unwrap();
        state.add_minter(&admin(), minter()).unwrap();
        state
    }

    #[test]
    fn test_max_supply_value() {
        assert_eq!(MAX_SUPPLY, 15_000_000_000_000_000_000_000_000_000);
    }

    #[test]
    fn test_compute_tax_floor_division() {
        assert_eq!(compute_tax(100 * BASE_UNITS_PER_TOKEN).unwrap(), BASE_UNITS_PER_TOKEN);
        assert_eq!(compute_tax(1).unwrap(), 0);
        assert_eq!(compute_tax(99).unwrap(), 0);
        assert_eq!(compute_tax(100).unwrap(), 1);
        assert_eq!(compute_tax(199).unwrap(), 1);
    }

    #[test]
    fn test_zero_admin_rejected() {
        let result = LedgerState::new(Address::zero(), ledger_address());
        assert_eq!(result.unwrap_err(), TokenError::ZeroAddress("admin"));
    }

    #[test]
    fn test_admin_does_not_mint_implicitly() {
        let mut state = LedgerState::new(admin(), ledger_address()).unwrap();
        assert!(!state.is_minter(&admin()));
        let result = state.mint(&admin(), admin(), 1);
        assert!(matches!(result, Err(TokenError::Unauthorized(_))));
    }

    #[test]
    fn test_add_minter_idempotent() {
        let mut state = create_test_state();
        let before = state.roles().clone();

        assert!(!state.add_minter(&admin(), minter()).unwrap());
        assert_eq!(state.roles(), &before);
        assert_eq!(state.roles().minters().count(), 1);
    }

    #[test]
    fn test_remove_non_minter_is_noop() {
        let mut state = create_test_state();
        assert!(!state.remove_minter(&admin(), &Address::repeat(9)).unwrap());
        assert!(state.is_minter(&minter()));

        assert!(state.remove_minter(&admin(), &minter()).unwrap());
        assert!(!state.is_minter(&minter()));
    }

    #[test]
    fn test_role_management_requires_admin() {
        let mut state = create_test_state();
        let result = state.add_minter(&minter(), Address::repeat(3));
        assert!(matches!(result, Err(TokenError::Unauthorized(_))));
        let result = state.remove_minter(&minter(), &minter());
        assert!(matches!(result, Err(TokenError::Unauthorized(_))));
        assert!(state.is_minter(&minter()));
    }

    #[test]
    fn test_mint_up_to_cap() {
        let mut state = create_test_state();
        let holder = Address::repeat(1);

        state.mint(&minter(), holder, MAX_SUPPLY).unwrap();
        assert_eq!(state.total_supply(), MAX_SUPPLY);
        assert_eq!(state.mintable_supply(), 0);

        let result = state.mint(&minter(), holder, 1);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), lib_types::ErrorKind::InsufficientResource);
        assert_eq!(state.balance_of(&holder), MAX_SUPPLY);
    }

    #[test]
    fn test_mint_cap_plus_one_fails() {
        let mut state = create_test_state();
        let result = state.mint(&minter(), Address::repeat(1), MAX_SUPPLY + 1);
        assert_eq!(
            result,
            Err(TokenError::SupplyCapExceeded {
                max: MAX_SUPPLY,
                would_have: MAX_SUPPLY + 1,
            })
        );
        assert_eq!(state.total_supply(), 0);
    }

    #[test]
    fn test_mint_batch_all_or_nothing() {
        let mut state = create_test_state();
        let a = Address::repeat(1);
        let b = Address::repeat(2);

        let result = state.mint_batch(&minter(), &[(a, 10), (Address::zero(), 5), (b, 10)]);
        assert!(matches!(result, Err(TokenError::ZeroAddress(_))));
        assert_eq!(state.balance_of(&a), 0);
        assert_eq!(state.total_supply(), 0);

        let total = state.mint_batch(&minter(), &[(a, 10), (b, 20), (a, 5)]).unwrap();
        assert_eq!(total, 35);
        assert_eq!(state.balance_of(&a), 15);
        assert_eq!(state.balance_of(&b), 20);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_burn_reduces_supply() {
        let mut state = create_test_state();
        let holder = Address::repeat(1);
        state.mint(&minter(), holder, 1_000).unwrap();

        state.burn(&holder, 400).unwrap();
        assert_eq!(state.balance_of(&holder), 600);
        assert_eq!(state.total_supply(), 600);
        assert_eq!(state.total_burned(), 400);

        let result = state.burn(&holder, 601);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { have: 600, need: 601 })));
    }

    #[test]
    fn test_withdraw_stuck() {
        let mut state = create_test_state();
        let rescue_to = Address::repeat(7);

        let result = state.withdraw_stuck(&admin(), rescue_to);
        assert!(matches!(result, Err(TokenError::NothingToWithdraw(_))));

        state.mint(&minter(), ledger_address(), 250).unwrap();
        let result = state.withdraw_stuck(&minter(), rescue_to);
        assert!(matches!(result, Err(TokenError::Unauthorized(_))));

        assert_eq!(state.withdraw_stuck(&admin(), rescue_to).unwrap(), 250);
        assert_eq!(state.balance_of(&ledger_address()), 0);
        assert_eq!(state.balance_of(&rescue_to), 250);
        assert_eq!(state.total_supply(), 250);
    }

    #[test]
    fn test_zero_balances_pruned() {
        let mut state = create_test_state();
        let holder = Address::repeat(1);
        state.mint(&minter(), holder, 10).unwrap();
        state.burn(&holder, 10).unwrap();
        assert_eq!(state.holders().count(), 0);
    }

    #[test]
    fn test_check_invariants_detects_tampering() {
        let mut state = create_test_state();
        state.mint(&minter(), Address::repeat(1), 10).unwrap();
        state.set_supply(11, 0);
        assert!(matches!(
            state.check_invariants(),
            Err(TokenError::ConservationViolated(_))
        ));
    }

    #[test]
    fn test_events_only_on_commit() {
        let mut state = create_test_state();
        state.take_events();

        let _ = state.mint(&minter(), Address::repeat(1), MAX_SUPPLY + 1);
        assert!(state.take_events().is_empty());

        state.mint(&minter(), Address::repeat(1), 5).unwrap();
        assert_eq!(
            state.take_events(),
            vec![LedgerEvent::Minted {
                minter: minter(),
                to: Address::repeat(1),
                amount: 5
            }]
        );
    }
}
