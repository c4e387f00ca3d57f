//! Thread-safe ledger handle
//!
//! Wraps [`LedgerState`] in a `parking_lot::RwLock`. Every mutating call
//! runs to completion under a single write guard; reads share the lock and
//! always observe a fully applied state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use lib_types::{Address, Amount};

use crate::contract::LedgerState;
use crate::errors::TokenResult;
use crate::events::{EventSeq, EventSink, LedgerEvent};
use crate::transfer::{apply_transfer, TransferResult};

/// Shared SCORCH ledger
pub struct Ledger {
    state: RwLock<LedgerState>,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
    /// Next event sequence; only advanced under the state write lock
    next_seq: AtomicU64,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Ledger")
            .field("total_supply", &state.total_supply())
            .field("admin", &state.admin())
            .finish()
    }
}

impl Ledger {
    /// Create an empty ledger with a fixed admin
    pub fn new(admin: Address, self_address: Address) -> TokenResult<Self> {
        Ok(Self::from_parts(LedgerState::new(admin, self_address)?))
    }

    /// Rebuild a ledger from a snapshot, verifying its invariants first
    pub fn from_state(state: LedgerState) -> TokenResult<Self> {
        state.check_invariants()?;
        Ok(Self::from_parts(state))
    }

    fn from_parts(state: LedgerState) -> Self {
        Self {
            state: RwLock::new(state),
            sinks: RwLock::new(Vec::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Register a receiver for committed events
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    /// Run `op` under the write lock, then publish what it emitted
    ///
    /// Sequence numbers are taken before the guard drops, so they follow
    /// commit order even when delivery from two threads interleaves.
    fn mutate<T>(&self, op: impl FnOnce(&mut LedgerState) -> TokenResult<T>) -> TokenResult<T> {
        let (result, events, first_seq) = {
            let mut state = self.state.write();
            let result = op(&mut state);
            // Failed operations never emit; draining keeps the buffer empty
            let events = state.take_events();
            let first_seq = if result.is_ok() {
                self.next_seq.fetch_add(events.len() as u64, Ordering::SeqCst)
            } else {
                0
            };
            (result, events, first_seq)
        };
        if result.is_ok() {
            self.publish(first_seq, &events);
        }
        result
    }

    fn publish(&self, first_seq: EventSeq, events: &[LedgerEvent]) {
        if events.is_empty() {
            return;
        }
        let sinks: Vec<Arc<dyn EventSink>> = self.sinks.read().clone();
        for (seq, event) in (first_seq..).zip(events) {
            debug!(seq, %event, "ledger event");
            for sink in &sinks {
                sink.on_sequenced(seq, event);
            }
        }
    }

    // ─── Mutations ──────────────────────────────────────────────────────────

    pub fn mint(&self, caller: &Address, to: Address, amount: Amount) -> TokenResult<()> {
        self.mutate(|state| state.mint(caller, to, amount))?;
        info!(minter = %caller, to = %to, amount, "minted");
        Ok(())
    }

    /// Atomic multi-recipient mint. Returns the total minted.
    pub fn mint_batch(&self, caller: &Address, recipients: &[(Address, Amount)]) -> TokenResult<Amount> {
        let total = self.mutate(|state| state.mint_batch(caller, recipients))?;
        info!(minter = %caller, recipients = recipients.len(), total, "batch minted");
        Ok(total)
    }

    pub fn transfer(&self, from: Address, to: Address, amount: Amount) -> TokenResult<TransferResult> {
        let result = self.mutate(|state| apply_transfer(state, from, to, amount))?;
        if amount > 0 {
            info!(from = %from, to = %to, amount, tax = result.tax, "transferred");
        }
        Ok(result)
    }

    pub fn burn(&self, holder: &Address, amount: Amount) -> TokenResult<()> {
        self.mutate(|state| state.burn(holder, amount))?;
        info!(holder = %holder, amount, "burned");
        Ok(())
    }

    pub fn add_minter(&self, caller: &Address, minter: Address) -> TokenResult<()> {
        if self.mutate(|state| state.add_minter(caller, minter))? {
            info!(minter = %minter, "minter added");
        } else {
            debug!(minter = %minter, "already a minter");
        }
        Ok(())
    }

    pub fn remove_minter(&self, caller: &Address, minter: &Address) -> TokenResult<()> {
        if self.mutate(|state| state.remove_minter(caller, minter))? {
            info!(minter = %minter, "minter removed");
        } else {
            debug!(minter = %minter, "not a minter");
        }
        Ok(())
    }

    pub fn withdraw_stuck(&self, caller: &Address, to: Address) -> TokenResult<Amount> {
        let amount = self.mutate(|state| state.withdraw_stuck(caller, to))?;
        info!(to = %to, amount, "stuck tokens withdrawn");
        Ok(amount)
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.state.read().balance_of(address)
    }

    pub fn total_supply(&self) -> Amount {
        self.state.read().total_supply()
    }

    pub fn total_burned(&self) -> Amount {
        self.state.read().total_burned()
    }

    pub fn is_minter(&self, address: &Address) -> bool {
        self.state.read().is_minter(address)
    }

    pub fn admin(&self) -> Address {
        self.state.read().admin()
    }

    pub fn self_address(&self) -> Address {
        self.state.read().self_address
    }

    pub fn mintable_supply(&self) -> Amount {
        self.state.read().mintable_supply()
    }

    /// Consistent copy of the whole ledger
    pub fn snapshot(&self) -> LedgerState {
        self.state.read().clone()
    }
}
