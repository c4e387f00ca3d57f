//! Ledger Event Emission
//!
//! Events are collected while an operation holds the ledger lock and are
//! delivered to sinks only after the lock is released. A sink may therefore
//! read from or call back into the ledger without deadlocking, and never
//! sees a half-applied mutation.
//!
//! Delivery from concurrent mutations can interleave, so arrival order is
//! not commit order. Each event carries an [`EventSeq`] assigned under the
//! write lock; sorting by it restores commit order. [`EventLog`] does this
//! on insert.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount};

// ============================================================================
// EVENT TYPES
// ============================================================================

/// State changes recorded by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// New supply created
    Minted {
        minter: Address,
        to: Address,
        amount: Amount,
    },

    /// Tokens moved between two non-null accounts
    Transferred {
        from: Address,
        to: Address,
        amount: Amount,
    },

    /// Transfer tax destroyed. Only emitted when tax > 0.
    TaxBurned {
        from: Address,
        to: Address,
        amount: Amount,
        tax: Amount,
    },

    /// Explicit burn, or a transfer to the null address
    Burned { holder: Address, amount: Amount },

    MinterAdded { minter: Address },

    MinterRemoved { minter: Address },

    /// Admin rescued tokens parked at the ledger's own address
    StuckWithdrawn { to: Address, amount: Amount },
}

impl std::fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEvent::Minted { to, amount, .. } => write!(f, "Minted({} -> {:?})", amount, to),
            LedgerEvent::Transferred { from, to, amount } => {
                write!(f, "Transferred({} {:?} -> {:?})", amount, from, to)
            }
            LedgerEvent::TaxBurned { tax, .. } => write!(f, "TaxBurned({})", tax),
            LedgerEvent::Burned { holder, amount } => write!(f, "Burned({} from {:?})", amount, holder),
            LedgerEvent::MinterAdded { minter } => write!(f, "MinterAdded({:?})", minter),
            LedgerEvent::MinterRemoved { minter } => write!(f, "MinterRemoved({:?})", minter),
            LedgerEvent::StuckWithdrawn { to, amount } => {
                write!(f, "StuckWithdrawn({} -> {:?})", amount, to)
            }
        }
    }
}

// ============================================================================
// EVENT SINK
// ============================================================================

/// Commit-order position of an event, starting at 0 for each ledger handle
pub type EventSeq = u64;

/// Receiver of committed ledger events
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &LedgerEvent);

    /// Entry point used by the ledger. Sinks that care about commit order
    /// across threads override this; the default drops the sequence.
    fn on_sequenced(&self, _seq: EventSeq, event: &LedgerEvent) {
        self.on_event(event);
    }
}

/// In-memory sink that keeps every event it receives, in commit order
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<(EventSeq, LedgerEvent)>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().iter().map(|(_, event)| event.clone()).collect()
    }

    /// Recorded events with their sequence numbers
    pub fn sequenced(&self) -> Vec<(EventSeq, LedgerEvent)> {
        self.events.lock().clone()
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.lock())
            .into_iter()
            .map(|(_, event)| event)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    /// Unsequenced events are appended after everything seen so far
    fn on_event(&self, event: &LedgerEvent) {
        let mut events = self.events.lock();
        let seq = events.last().map_or(0, |(seq, _)| seq + 1);
        events.push((seq, event.clone()));
    }

    fn on_sequenced(&self, seq: EventSeq, event: &LedgerEvent) {
        let mut events = self.events.lock();
        let at = events.partition_point(|(existing, _)| *existing < seq);
        events.insert(at, (seq, event.clone()));
    }
}
