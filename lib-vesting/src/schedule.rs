//! Presale and vesting operations
//!
//! # Operations
//!
//! - `start`: one-time activation of the global vesting clock (admin)
//! - `purchase`: buy entitlement in the current phase with the payment asset
//! - `releasable_amount`: how much a beneficiary can claim right now
//! - `claim`: mint the releasable amount through the ledger
//! - `advance_phase`: move to the next priced phase (admin)
//!
//! # Flow
//!
//! 1. Admin calls `start`; purchases open once the clock has moved past it
//! 2. Buyers approve the presale on the payment asset and call `purchase`
//! 3. After the cliff, beneficiaries `claim` periodically
//! 4. The ledger mints the claimed amount to the beneficiary
//!
//! The schedule never touches balances directly; it only asks the ledger to
//! mint under its own identity, which must hold the minter role.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lib_tokens::Ledger;
use lib_types::{Address, Amount, Bps, Clock, Timestamp, MAX_BPS};

use crate::errors::{VestingError, VestingResult};
use crate::payment::{PaymentAsset, PaymentSettlement};
use crate::phase::{Phase, PhaseTable};
use crate::vesting_types::{VestingInfo, VestingStatus};

/// Share of each presale payment that is burned: 95.5%
pub const DEFAULT_PAYMENT_BURN_BPS: Bps = 9_550;

/// Fixed parameters of a presale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresaleConfig {
    /// Only address allowed to start vesting and advance phases
    pub admin: Address,
    /// Identity the schedule uses as payment spender and as ledger minter
    pub presale_address: Address,
    /// Receives the unburned share of every payment
    pub operations: Address,
    /// Burned share of every payment
    pub payment_burn_bps: Bps,
}

impl PresaleConfig {
    pub fn validate(&self) -> VestingResult<()> {
        if self.admin.is_zero() || self.presale_address.is_zero() || self.operations.is_zero() {
            return Err(VestingError::InvalidState(
                "admin, presale and operations addresses must be non-zero".to_string(),
            ));
        }
        if self.payment_burn_bps > MAX_BPS {
            return Err(VestingError::InvalidState(format!(
                "payment burn {} bps exceeds 100%",
                self.payment_burn_bps
            )));
        }
        Ok(())
    }
}

/// Serializable presale + vesting state
///
/// Uses BTreeMap for deterministic serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingState {
    pub config: PresaleConfig,
    pub phases: PhaseTable,
    /// Beneficiary -> entitlement
    pub beneficiaries: BTreeMap<Address, VestingInfo>,
    /// Set exactly once by `start`
    pub vesting_start_time: Option<Timestamp>,
    /// Cumulative payment received across all phases
    pub total_raised: Amount,
}

impl VestingState {
    pub fn new(config: PresaleConfig, phases: Vec<Phase>) -> VestingResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            phases: PhaseTable::new(phases)?,
            beneficiaries: BTreeMap::new(),
            vesting_start_time: None,
            total_raised: 0,
        })
    }

    /// Check every invariant of a (possibly restored) state
    pub fn validate(&self) -> VestingResult<()> {
        self.config.validate()?;
        self.phases.validate()?;
        for (beneficiary, info) in &self.beneficiaries {
            if info.claimed_amount > info.total_amount {
                return Err(VestingError::InvalidState(format!(
                    "{} claimed {} of {}",
                    beneficiary, info.claimed_amount, info.total_amount
                )));
            }
        }
        Ok(())
    }

    pub fn status(&self) -> VestingStatus {
        match self.vesting_start_time {
            Some(_) => VestingStatus::Active,
            None => VestingStatus::NotStarted,
        }
    }

    pub fn vesting_info(&self, beneficiary: &Address) -> VestingInfo {
        self.beneficiaries.get(beneficiary).copied().unwrap_or_default()
    }

    pub fn releasable_amount(&self, beneficiary: &Address, now: Timestamp) -> VestingResult<Amount> {
        self.vesting_info(beneficiary)
            .releasable_amount(self.vesting_start_time, now)
    }

    fn verify_admin(&self, caller: &Address) -> VestingResult<()> {
        if caller != &self.config.admin {
            return Err(VestingError::Unauthorized(format!("{} is not the admin", caller)));
        }
        Ok(())
    }
}

/// Receipt of a successful purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub phase: usize,
    pub payment: Amount,
    /// Entitlement accrued, in token base units
    pub tokens: Amount,
    pub settlement: PaymentSettlement,
}

/// Thread-safe presale + vesting schedule
///
/// Cross-thread calls are serialized by a reentrant mutex. A call that
/// re-enters the schedule on the same thread (from a payment asset or a
/// ledger event sink invoked mid-operation) finds the state already
/// borrowed and fails with [`VestingError::Reentrancy`].
pub struct VestingSchedule {
    state: ReentrantMutex<RefCell<VestingState>>,
    ledger: Arc<Ledger>,
    payment: Arc<dyn PaymentAsset>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for VestingSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VestingSchedule").finish_non_exhaustive()
    }
}

impl VestingSchedule {
    pub fn new(
        config: PresaleConfig,
        phases: Vec<Phase>,
        ledger: Arc<Ledger>,
        payment: Arc<dyn PaymentAsset>,
        clock: Arc<dyn Clock>,
    ) -> VestingResult<Self> {
        let state = VestingState::new(config, phases)?;
        Ok(Self::from_parts(state, ledger, payment, clock))
    }

    /// Rebuild from a snapshot, validating it first
    pub fn from_state(
        state: VestingState,
        ledger: Arc<Ledger>,
        payment: Arc<dyn PaymentAsset>,
        clock: Arc<dyn Clock>,
    ) -> VestingResult<Self> {
        state.validate()?;
        Ok(Self::from_parts(state, ledger, payment, clock))
    }

    fn from_parts(
        state: VestingState,
        ledger: Arc<Ledger>,
        payment: Arc<dyn PaymentAsset>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(state)),
            ledger,
            payment,
            clock,
        }
    }

    fn mutate<T>(&self, op: impl FnOnce(&mut VestingState) -> VestingResult<T>) -> VestingResult<T> {
        let guard = self.state.lock();
        let mut state = guard.try_borrow_mut().map_err(|_| VestingError::Reentrancy)?;
        op(&mut state)
    }

    fn read<T>(&self, op: impl FnOnce(&VestingState) -> T) -> VestingResult<T> {
        let guard = self.state.lock();
        let state = guard.try_borrow().map_err(|_| VestingError::Reentrancy)?;
        Ok(op(&state))
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────────

    /// Start the global vesting clock. One time only.
    pub fn start(&self, caller: &Address) -> VestingResult<Timestamp> {
        self.mutate(|state| {
            state.verify_admin(caller)?;
            if let Some(started) = state.vesting_start_time {
                return Err(VestingError::AlreadyStarted(started));
            }
            let now = self.clock.now();
            state.vesting_start_time = Some(now);
            info!(start = now, "vesting started");
            Ok(now)
        })
    }

    /// Move to the next phase. Phases cannot be skipped.
    pub fn advance_phase(&self, caller: &Address) -> VestingResult<usize> {
        self.mutate(|state| {
            state.verify_admin(caller)?;
            let index = state.phases.advance()?;
            info!(phase = index, price = state.phases.current().price, "phase advanced");
            Ok(index)
        })
    }

    // ─── Presale ────────────────────────────────────────────────────────────

    /// Buy entitlement in the current phase
    ///
    /// Nothing is minted: the entitlement is released through `claim`.
    /// If the payment asset rejects the payment, presale state is unchanged.
    pub fn purchase(&self, buyer: &Address, payment_amount: Amount) -> VestingResult<PurchaseReceipt> {
        self.mutate(|state| {
            let now = self.clock.now();
            match state.vesting_start_time {
                Some(start) if now > start => {}
                _ => return Err(VestingError::NotActive),
            }
            if buyer.is_zero() {
                return Err(VestingError::InvalidAmount("buyer is the zero address".to_string()));
            }
            if payment_amount == 0 {
                return Err(VestingError::InvalidAmount("payment must be > 0".to_string()));
            }

            // Stage every new value before the external payment call
            let phase_index = state.phases.current_index();
            let tokens = state.phases.current().quote(payment_amount)?;
            let new_sold = state.phases.check_sale(tokens)?;
            let mut info = state.vesting_info(buyer);
            info.total_amount = info
                .total_amount
                .checked_add(tokens)
                .ok_or(VestingError::Overflow)?;
            let new_raised = state
                .total_raised
                .checked_add(payment_amount)
                .ok_or(VestingError::Overflow)?;

            let settlement = self.payment.collect(
                buyer,
                &state.config.presale_address,
                payment_amount,
                state.config.payment_burn_bps,
                &state.config.operations,
            )?;

            // Commit
            state.phases.set_current_sold(new_sold);
            state.beneficiaries.insert(*buyer, info);
            state.total_raised = new_raised;

            info!(
                buyer = %buyer,
                phase = phase_index,
                payment = payment_amount,
                tokens,
                "presale purchase"
            );
            Ok(PurchaseReceipt {
                phase: phase_index,
                payment: payment_amount,
                tokens,
                settlement,
            })
        })
    }

    // ─── Release ────────────────────────────────────────────────────────────

    /// Claim everything releasable for `beneficiary`
    ///
    /// The ledger mint happens before `claimed_amount` moves; if the mint
    /// fails (e.g. supply cap) the claim fails with no state change.
    pub fn claim(&self, beneficiary: &Address) -> VestingResult<Amount> {
        self.mutate(|state| {
            let now = self.clock.now();
            let releasable = state.releasable_amount(beneficiary, now)?;
            if releasable == 0 {
                return Err(VestingError::NothingToClaim);
            }
            let mut info = state.vesting_info(beneficiary);
            info.claimed_amount = info
                .claimed_amount
                .checked_add(releasable)
                .ok_or(VestingError::Overflow)?;
            if info.claimed_amount > info.total_amount {
                return Err(VestingError::Underflow);
            }

            self.ledger
                .mint(&state.config.presale_address, *beneficiary, releasable)?;

            state.beneficiaries.insert(*beneficiary, info);
            info!(beneficiary = %beneficiary, amount = releasable, "vested tokens claimed");
            Ok(releasable)
        })
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn releasable_amount(&self, beneficiary: &Address) -> VestingResult<Amount> {
        let now = self.clock.now();
        let releasable = self.read(|state| state.releasable_amount(beneficiary, now))??;
        debug!(beneficiary = %beneficiary, releasable, "releasable queried");
        Ok(releasable)
    }

    pub fn vesting_info(&self, beneficiary: &Address) -> VestingResult<VestingInfo> {
        self.read(|state| state.vesting_info(beneficiary))
    }

    pub fn status(&self) -> VestingResult<VestingStatus> {
        self.read(|state| state.status())
    }

    pub fn vesting_start_time(&self) -> VestingResult<Option<Timestamp>> {
        self.read(|state| state.vesting_start_time)
    }

    pub fn current_phase(&self) -> VestingResult<(usize, Phase)> {
        self.read(|state| (state.phases.current_index(), *state.phases.current()))
    }

    pub fn phase(&self, index: usize) -> VestingResult<Option<Phase>> {
        self.read(|state| state.phases.get(index).copied())
    }

    pub fn phases(&self) -> VestingResult<Vec<Phase>> {
        self.read(|state| state.phases.phases().to_vec())
    }

    pub fn total_sold(&self) -> VestingResult<Amount> {
        self.read(|state| state.phases.total_sold())
    }

    pub fn total_raised(&self) -> VestingResult<Amount> {
        self.read(|state| state.total_raised)
    }

    pub fn presale_address(&self) -> VestingResult<Address> {
        self.read(|state| state.config.presale_address)
    }

    /// Consistent copy of the whole schedule
    pub fn snapshot(&self) -> VestingResult<VestingState> {
        self.read(|state| state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::InMemoryPaymentAsset;
    use crate::vesting_types::{VESTING_CLIFF, VESTING_TOTAL};
    use lib_types::{ErrorKind, ManualClock, BASE_UNITS_PER_TOKEN};

    const TOKEN: Amount = BASE_UNITS_PER_TOKEN;
    const GENESIS: Timestamp = 1_700_000_000;

    fn admin() -> Address {
        Address::repeat(0xAA)
    }

    fn presale() -> Address {
        Address::repeat(0xBB)
    }

    fn operations() -> Address {
        Address::repeat(0xCC)
    }

    fn buyer() -> Address {
        Address::repeat(0x01)
    }

    struct Fixture {
        schedule: VestingSchedule,
        ledger: Arc<Ledger>,
        payment: Arc<InMemoryPaymentAsset>,
        clock: Arc<ManualClock>,
    }

    fn create_fixture(phases: Vec<Phase>) -> Fixture {
        let ledger = Arc::new(Ledger::new(admin(), Address::repeat(0x5C)).unwrap());
        ledger.add_minter(&admin(), presale()).unwrap();
        let payment = Arc::new(InMemoryPaymentAsset::new());
        let clock = Arc::new(ManualClock::new(GENESIS));
        let config = PresaleConfig {
            admin: admin(),
            presale_address: presale(),
            operations: operations(),
            payment_burn_bps: DEFAULT_PAYMENT_BURN_BPS,
        };
        let schedule = VestingSchedule::new(
            config,
            phases,
            ledger.clone(),
            payment.clone(),
            clock.clone(),
        )
        .unwrap();
        Fixture {
            schedule,
            ledger,
            payment,
            clock,
        }
    }

    fn fund(fixture: &Fixture, who: Address, amount: Amount) {
        fixture.payment.mint_to(who, amount).unwrap();
        fixture.payment.approve(who, presale(), amount).unwrap();
    }

    fn default_phases() -> Vec<Phase> {
        vec![
            Phase::new(1_000, 1_000_000 * TOKEN),
            Phase::new(2_000, 1_000_000 * TOKEN),
        ]
    }

    #[test]
    fn test_start_is_admin_only_and_once() {
        let f = create_fixture(default_phases());
        assert!(matches!(f.schedule.start(&buyer()), Err(VestingError::Unauthorized(_))));
        assert_eq!(f.schedule.status().unwrap(), VestingStatus::NotStarted);

        assert_eq!(f.schedule.start(&admin()).unwrap(), GENESIS);
        assert_eq!(f.schedule.status().unwrap(), VestingStatus::Active);
        assert_eq!(
            f.schedule.start(&admin()),
            Err(VestingError::AlreadyStarted(GENESIS))
        );
    }

    #[test]
    fn test_purchase_requires_active_presale() {
        let f = create_fixture(default_phases());
        fund(&f, buyer(), 10_000);
        assert_eq!(f.schedule.purchase(&buyer(), 1_000), Err(VestingError::NotActive));

        f.schedule.start(&admin()).unwrap();
        // Same second as start: not yet past it
        assert_eq!(f.schedule.purchase(&buyer(), 1_000), Err(VestingError::NotActive));

        f.clock.advance(1);
        assert!(f.schedule.purchase(&buyer(), 1_000).is_ok());
    }

    #[test]
    fn test_purchase_price_1000_payment_1000() {
        let f = create_fixture(default_phases());
        fund(&f, buyer(), 10_000);
        f.schedule.start(&admin()).unwrap();
        f.clock.advance(1);

        let receipt = f.schedule.purchase(&buyer(), 1_000).unwrap();
        assert_eq!(receipt.tokens, TOKEN);
        assert_eq!(receipt.phase, 0);
        assert_eq!(receipt.settlement.burned, 955);
        assert_eq!(receipt.settlement.forwarded, 45);

        let (_, phase) = f.schedule.current_phase().unwrap();
        assert_eq!(phase.sold, TOKEN);
        assert_eq!(f.schedule.vesting_info(&buyer()).unwrap().total_amount, TOKEN);
        assert_eq!(f.payment.balance_of(&operations()), 45);
        // No immediate mint
        assert_eq!(f.ledger.balance_of(&buyer()), 0);
        assert_eq!(f.ledger.total_supply(), 0);
    }

    #[test]
    fn test_purchase_rejects_zero_payment() {
        let f = create_fixture(default_phases());
        f.schedule.start(&admin()).unwrap();
        f.clock.advance(1);
        let err = f.schedule.purchase(&buyer(), 0).unwrap_err();
        assert!(matches!(err, VestingError::InvalidAmount(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_purchase_phase_exhausted() {
        let f = create_fixture(vec![Phase::new(1_000, TOKEN)]);
        fund(&f, buyer(), 10_000);
        f.schedule.start(&admin()).unwrap();
        f.clock.advance(1);

        let err = f.schedule.purchase(&buyer(), 1_001).unwrap_err();
        assert!(matches!(err, VestingError::PhaseExhausted { .. }));
        assert_eq!(err.kind(), ErrorKind::InsufficientResource);
        assert_eq!(f.payment.balance_of(&buyer()), 10_000);

        f.schedule.purchase(&buyer(), 1_000).unwrap();
        assert!(matches!(
            f.schedule.purchase(&buyer(), 1),
            Err(VestingError::PhaseExhausted { .. })
        ));
    }

    #[test]
    fn test_purchase_too_small_for_price() {
        let f = create_fixture(vec![Phase::new(2 * TOKEN, 1_000 * TOKEN)]);
        fund(&f, buyer(), 10);
        f.schedule.start(&admin()).unwrap();
        f.clock.advance(1);
        assert!(matches!(
            f.schedule.purchase(&buyer(), 1),
            Err(VestingError::PhaseExhausted { requested: 0, .. })
        ));
    }

    #[test]
    fn test_failed_payment_leaves_state_unchanged() {
        let f = create_fixture(default_phases());
        f.payment.mint_to(buyer(), 10_000).unwrap();
        f.payment.approve(buyer(), presale(), 500).unwrap();
        f.schedule.start(&admin()).unwrap();
        f.clock.advance(1);
        let before = f.schedule.snapshot().unwrap();

        let err = f.schedule.purchase(&buyer(), 1_000).unwrap_err();
        assert!(matches!(err, VestingError::Payment(_)));
        assert_eq!(err.kind(), ErrorKind::InsufficientResource);
        assert_eq!(f.schedule.snapshot().unwrap(), before);
    }

    #[test]
    fn test_purchase_uses_current_phase_price() {
        let f = create_fixture(default_phases());
        fund(&f, buyer(), 10_000);
        f.schedule.start(&admin()).unwrap();
        f.clock.advance(1);

        assert!(matches!(
            f.schedule.advance_phase(&buyer()),
            Err(VestingError::Unauthorized(_))
        ));
        assert_eq!(f.schedule.advance_phase(&admin()).unwrap(), 1);
        let receipt = f.schedule.purchase(&buyer(), 1_000).unwrap();
        assert_eq!(receipt.phase, 1);
        assert_eq!(receipt.tokens, TOKEN / 2);
        assert_eq!(f.schedule.advance_phase(&admin()), Err(VestingError::LastPhase(1)));
    }

    #[test]
    fn test_claim_before_cliff_fails() {
        let f = create_fixture(default_phases());
        fund(&f, buyer(), 1_000_000);
        f.schedule.start(&admin()).unwrap();
        f.clock.advance(1);
        f.schedule.purchase(&buyer(), 1_000_000).unwrap();

        f.clock.advance(VESTING_CLIFF - 10);
        assert_eq!(f.schedule.releasable_amount(&buyer()).unwrap(), 0);
        assert_eq!(f.schedule.claim(&buyer()), Err(VestingError::NothingToClaim));
    }

    #[test]
    fn test_claim_after_end_mints_everything() {
        let f = create_fixture(default_phases());
        fund(&f, buyer(), 1_000_000);
        f.schedule.start(&admin()).unwrap();
        f.clock.advance(1);
        f.schedule.purchase(&buyer(), 1_000_000).unwrap();

        f.clock.set(GENESIS + VESTING_TOTAL + 1);
        let total = 1_000 * TOKEN;
        assert_eq!(f.schedule.releasable_amount(&buyer()).unwrap(), total);
        assert_eq!(f.schedule.claim(&buyer()).unwrap(), total);
        assert_eq!(f.ledger.balance_of(&buyer()), total);

        let info = f.schedule.vesting_info(&buyer()).unwrap();
        assert_eq!(info.claimed_amount, info.total_amount);
        assert_eq!(f.schedule.claim(&buyer()), Err(VestingError::NothingToClaim));
    }

    #[test]
    fn test_claim_fails_atomically_when_mint_fails() {
        let f = create_fixture(default_phases());
        fund(&f, buyer(), 1_000);
        f.schedule.start(&admin()).unwrap();
        f.clock.advance(1);
        f.schedule.purchase(&buyer(), 1_000).unwrap();
        f.clock.set(GENESIS + VESTING_TOTAL);

        // Revoke the presale's mint capability
        f.ledger.remove_minter(&admin(), &presale()).unwrap();
        let err = f.schedule.claim(&buyer()).unwrap_err();
        assert!(matches!(err, VestingError::Ledger(_)));
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(f.schedule.vesting_info(&buyer()).unwrap().claimed_amount, 0);

        f.ledger.add_minter(&admin(), presale()).unwrap();
        assert_eq!(f.schedule.claim(&buyer()).unwrap(), TOKEN);
    }
}
