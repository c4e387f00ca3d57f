//! Tiered payroll
//!
//! Employees are assigned to salary tiers. A keeper (or the admin) calls
//! `distribute_salary` periodically; every employee whose interval has
//! elapsed is paid one salary per elapsed interval, up to
//! [`MAX_CATCH_UP_PERIODS`], in a single ledger `mint_batch`.
//!
//! # Payment Rule
//!
//! ```text
//! periods = (now - last_paid) / interval
//! paid    = min(periods, MAX_CATCH_UP_PERIODS) * salary
//! last_paid += periods * interval
//! ```
//!
//! Periods beyond the catch-up cap are forfeited, not carried over.
//! `last_paid` only moves when the mint succeeds.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lib_tokens::Ledger;
use lib_types::{Address, Amount, Clock, Timestamp};

use crate::errors::{DistributionError, DistributionResult};

/// Most intervals paid out for one employee in a single run
pub const MAX_CATCH_UP_PERIODS: u64 = 12;

pub type TierId = u32;

/// Salary band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTier {
    pub id: TierId,
    /// Token base units per interval
    pub salary: Amount,
    pub interval_secs: u64,
}

impl PayrollTier {
    fn validate(&self) -> DistributionResult<()> {
        if self.salary == 0 {
            return Err(DistributionError::InvalidTier(format!("tier {} has zero salary", self.id)));
        }
        if self.interval_secs == 0 {
            return Err(DistributionError::InvalidTier(format!(
                "tier {} has zero interval",
                self.id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub address: Address,
    pub tier: TierId,
    /// Start of the first unpaid interval
    pub last_paid: Timestamp,
}

/// One employee's share of a payroll run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryPayment {
    pub employee: Address,
    pub periods: u64,
    pub amount: Amount,
}

/// Summary of a `distribute_salary` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRun {
    pub at: Timestamp,
    pub payments: Vec<SalaryPayment>,
    pub total: Amount,
}

impl PayrollRun {
    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }
}

/// Serializable payroll state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollState {
    pub admin: Address,
    /// Minter identity used on the ledger
    pub identity: Address,
    pub keeper: Option<Address>,
    pub tiers: BTreeMap<TierId, PayrollTier>,
    pub employees: BTreeMap<Address, Employee>,
    pub total_paid: Amount,
}

impl PayrollState {
    pub fn new(admin: Address, identity: Address) -> Self {
        Self {
            admin,
            identity,
            keeper: None,
            tiers: BTreeMap::new(),
            employees: BTreeMap::new(),
            total_paid: 0,
        }
    }

    pub fn validate(&self) -> DistributionResult<()> {
        for tier in self.tiers.values() {
            tier.validate()?;
        }
        for employee in self.employees.values() {
            if !self.tiers.contains_key(&employee.tier) {
                return Err(DistributionError::UnknownTier(employee.tier));
            }
        }
        Ok(())
    }

    fn verify_admin(&self, caller: &Address) -> DistributionResult<()> {
        if caller != &self.admin {
            return Err(DistributionError::Unauthorized(format!(
                "{} is not the payroll admin",
                caller
            )));
        }
        Ok(())
    }

    fn verify_operator(&self, caller: &Address) -> DistributionResult<()> {
        if caller == &self.admin || self.keeper.as_ref() == Some(caller) {
            return Ok(());
        }
        Err(DistributionError::Unauthorized(format!(
            "{} is neither admin nor keeper",
            caller
        )))
    }

    fn employees_in(&self, tier: TierId) -> usize {
        self.employees.values().filter(|e| e.tier == tier).count()
    }

    /// Payments due at `now` together with each employee's next `last_paid`
    fn due(&self, now: Timestamp) -> DistributionResult<Vec<(SalaryPayment, Timestamp)>> {
        let mut due = Vec::new();
        for employee in self.employees.values() {
            let tier = self
                .tiers
                .get(&employee.tier)
                .ok_or(DistributionError::UnknownTier(employee.tier))?;
            let elapsed = now.saturating_sub(employee.last_paid);
            let periods = elapsed / tier.interval_secs;
            if periods == 0 {
                continue;
            }
            let paid_periods = periods.min(MAX_CATCH_UP_PERIODS);
            let amount = tier
                .salary
                .checked_mul(paid_periods as Amount)
                .ok_or(DistributionError::Overflow)?;
            let next_last_paid = employee
                .last_paid
                .checked_add(periods * tier.interval_secs)
                .ok_or(DistributionError::Overflow)?;
            if periods > MAX_CATCH_UP_PERIODS {
                warn!(
                    employee = %employee.address,
                    periods,
                    forfeited = periods - MAX_CATCH_UP_PERIODS,
                    "salary backlog exceeds catch-up cap"
                );
            }
            due.push((
                SalaryPayment {
                    employee: employee.address,
                    periods: paid_periods,
                    amount,
                },
                next_last_paid,
            ));
        }
        Ok(due)
    }
}

/// Thread-safe payroll handle
///
/// Same locking model as the vesting schedule: a reentrant mutex around a
/// `RefCell`, so a ledger event sink calling back in gets
/// [`DistributionError::Reentrancy`].
pub struct Payroll {
    state: ReentrantMutex<RefCell<PayrollState>>,
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

impl Payroll {
    pub fn new(admin: Address, identity: Address, ledger: Arc<Ledger>, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(PayrollState::new(admin, identity), ledger, clock)
    }

    pub fn from_state(
        state: PayrollState,
        ledger: Arc<Ledger>,
        clock: Arc<dyn Clock>,
    ) -> DistributionResult<Self> {
        state.validate()?;
        Ok(Self::from_parts(state, ledger, clock))
    }

    fn from_parts(state: PayrollState, ledger: Arc<Ledger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(state)),
            ledger,
            clock,
        }
    }

    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut PayrollState) -> DistributionResult<T>,
    ) -> DistributionResult<T> {
        let guard = self.state.lock();
        let mut state = guard
            .try_borrow_mut()
            .map_err(|_| DistributionError::Reentrancy)?;
        op(&mut state)
    }

    fn read<T>(&self, op: impl FnOnce(&PayrollState) -> T) -> DistributionResult<T> {
        let guard = self.state.lock();
        let state = guard.try_borrow().map_err(|_| DistributionError::Reentrancy)?;
        Ok(op(&state))
    }

    // ─── Tiers ──────────────────────────────────────────────────────────────

    pub fn add_tier(&self, caller: &Address, tier: PayrollTier) -> DistributionResult<()> {
        self.mutate(|state| {
            state.verify_admin(caller)?;
            if state.tiers.contains_key(&tier.id) {
                return Err(DistributionError::DuplicateTier(tier.id));
            }
            tier.validate()?;
            state.tiers.insert(tier.id, tier);
            info!(tier = tier.id, salary = tier.salary, interval = tier.interval_secs, "tier added");
            Ok(())
        })
    }

    /// Replace salary and interval of an existing tier
    ///
    /// Applies from the next run; already elapsed time is paid at the new rate.
    pub fn update_tier(&self, caller: &Address, tier: PayrollTier) -> DistributionResult<()> {
        self.mutate(|state| {
            state.verify_admin(caller)?;
            if !state.tiers.contains_key(&tier.id) {
                return Err(DistributionError::UnknownTier(tier.id));
            }
            tier.validate()?;
            state.tiers.insert(tier.id, tier);
            info!(tier = tier.id, salary = tier.salary, interval = tier.interval_secs, "tier updated");
            Ok(())
        })
    }

    pub fn remove_tier(&self, caller: &Address, id: TierId) -> DistributionResult<PayrollTier> {
        self.mutate(|state| {
            state.verify_admin(caller)?;
            let employees = state.employees_in(id);
            if employees > 0 {
                return Err(DistributionError::TierInUse { tier: id, employees });
            }
            let removed = state.tiers.remove(&id).ok_or(DistributionError::UnknownTier(id))?;
            info!(tier = id, "tier removed");
            Ok(removed)
        })
    }

    // ─── Employees ──────────────────────────────────────────────────────────

    /// Register an employee. The first salary is due one interval from now.
    pub fn add_employee(&self, caller: &Address, address: Address, tier: TierId) -> DistributionResult<()> {
        self.mutate(|state| {
            state.verify_admin(caller)?;
            if address.is_zero() {
                return Err(DistributionError::InvalidRecipient("employee is the zero address".to_string()));
            }
            if !state.tiers.contains_key(&tier) {
                return Err(DistributionError::UnknownTier(tier));
            }
            if state.employees.contains_key(&address) {
                return Err(DistributionError::DuplicateEmployee(address));
            }
            let now = self.clock.now();
            state.employees.insert(
                address,
                Employee {
                    address,
                    tier,
                    last_paid: now,
                },
            );
            info!(employee = %address, tier, "employee added");
            Ok(())
        })
    }

    /// Remove an employee. Unpaid intervals are dropped.
    pub fn remove_employee(&self, caller: &Address, address: &Address) -> DistributionResult<Employee> {
        self.mutate(|state| {
            state.verify_admin(caller)?;
            let removed = state
                .employees
                .remove(address)
                .ok_or(DistributionError::UnknownEmployee(*address))?;
            info!(employee = %address, "employee removed");
            Ok(removed)
        })
    }

    pub fn set_keeper(&self, caller: &Address, keeper: Option<Address>) -> DistributionResult<()> {
        self.mutate(|state| {
            state.verify_admin(caller)?;
            state.keeper = keeper;
            match keeper {
                Some(k) => info!(keeper = %k, "keeper set"),
                None => info!("keeper cleared"),
            }
            Ok(())
        })
    }

    // ─── Distribution ───────────────────────────────────────────────────────

    /// Pay every employee whose interval has elapsed
    ///
    /// Returns an empty run when nobody is due.
    pub fn distribute_salary(&self, caller: &Address) -> DistributionResult<PayrollRun> {
        self.mutate(|state| {
            state.verify_operator(caller)?;
            let now = self.clock.now();
            let due = state.due(now)?;
            if due.is_empty() {
                debug!(at = now, "no salaries due");
                return Ok(PayrollRun {
                    at: now,
                    ..PayrollRun::default()
                });
            }

            let batch: Vec<(Address, Amount)> = due
                .iter()
                .map(|(payment, _)| (payment.employee, payment.amount))
                .collect();
            let total = self.ledger.mint_batch(&state.identity, &batch)?;
            let total_paid = state
                .total_paid
                .checked_add(total)
                .ok_or(DistributionError::Overflow)?;

            // Commit only after the mint landed
            let mut payments = Vec::with_capacity(due.len());
            for (payment, next_last_paid) in due {
                if let Some(employee) = state.employees.get_mut(&payment.employee) {
                    employee.last_paid = next_last_paid;
                }
                payments.push(payment);
            }
            state.total_paid = total_paid;

            info!(at = now, employees = payments.len(), total, "salaries distributed");
            Ok(PayrollRun {
                at: now,
                payments,
                total,
            })
        })
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn tiers(&self) -> DistributionResult<Vec<PayrollTier>> {
        self.read(|state| state.tiers.values().copied().collect())
    }

    pub fn employees(&self) -> DistributionResult<Vec<Employee>> {
        self.read(|state| state.employees.values().copied().collect())
    }

    pub fn employee(&self, address: &Address) -> DistributionResult<Option<Employee>> {
        self.read(|state| state.employees.get(address).copied())
    }

    pub fn keeper(&self) -> DistributionResult<Option<Address>> {
        self.read(|state| state.keeper)
    }

    pub fn total_paid(&self) -> DistributionResult<Amount> {
        self.read(|state| state.total_paid)
    }

    pub fn snapshot(&self) -> DistributionResult<PayrollState> {
        self.read(|state| state.clone())
    }
}
