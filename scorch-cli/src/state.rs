//! Persistent engine state
//!
//! Every command loads the JSON snapshot, rebuilds the live handles,
//! applies one operation and writes the snapshot back. Writes go to a
//! sibling temp file first and are renamed into place.
//!
//! The snapshot also records the latest time any invocation observed.
//! A restored clock never reports anything earlier, so time cannot run
//! backwards between processes. Nothing on the command line sets the time.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lib_distribution::{Airdrop, Payroll, PayrollState};
use lib_tokens::{Ledger, LedgerState};
use lib_types::{Address, Clock, ManualClock, SystemClock, Timestamp};
use lib_vesting::{InMemoryPaymentAsset, PaymentAssetState, VestingSchedule, VestingState};

use crate::cli_config::ScorchConfig;
use crate::error::{CliError, CliResult};

/// Snapshot format version
pub const STATE_VERSION: u32 = 2;

/// Where a deployment takes its time from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// Wall time, clamped to `last_seen`
    Wall,
    /// Stored time, moved forward only by the admin
    Simulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    pub mode: ClockMode,
    /// Latest time observed by any saved invocation
    pub last_seen: Timestamp,
}

impl ClockState {
    fn genesis(config: &ScorchConfig) -> Self {
        match config.simulated_clock {
            Some(start) => Self {
                mode: ClockMode::Simulated,
                last_seen: start,
            },
            None => Self {
                mode: ClockMode::Wall,
                last_seen: 0,
            },
        }
    }

    fn build(self) -> (Arc<dyn Clock>, Option<Arc<ManualClock>>) {
        match self.mode {
            ClockMode::Wall => (Arc::new(SystemClock::starting_at(self.last_seen)), None),
            ClockMode::Simulated => {
                let manual = Arc::new(ManualClock::new(self.last_seen));
                (manual.clone(), Some(manual))
            }
        }
    }
}

/// Everything the CLI persists between invocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub version: u32,
    pub clock: ClockState,
    pub ledger: LedgerState,
    pub vesting: VestingState,
    pub payment: PaymentAssetState,
    pub payroll: PayrollState,
}

/// Live handles wired together the same way a deployment would be
pub struct ScorchSystem {
    pub ledger: Arc<Ledger>,
    pub payment: Arc<InMemoryPaymentAsset>,
    pub vesting: VestingSchedule,
    pub payroll: Payroll,
    pub airdrop: Airdrop,
    clock: Arc<dyn Clock>,
    simulated: Option<Arc<ManualClock>>,
}

impl ScorchSystem {
    /// Fresh deployment: empty ledger with every collaborator registered
    /// as a minter
    pub fn genesis(config: &ScorchConfig) -> CliResult<Self> {
        config.validate()?;
        let (clock, simulated) = ClockState::genesis(config).build();
        let ledger = Arc::new(Ledger::new(config.admin, config.ledger_address)?);
        for minter in [config.presale_minter, config.airdrop_minter, config.payroll.minter] {
            ledger.add_minter(&config.admin, minter)?;
        }

        let payment = Arc::new(InMemoryPaymentAsset::new());
        let vesting = VestingSchedule::new(
            config.presale(),
            config.phase_table(),
            ledger.clone(),
            payment.clone(),
            clock.clone(),
        )?;
        let payroll = Payroll::new(config.admin, config.payroll.minter, ledger.clone(), clock.clone());
        if let Some(keeper) = config.payroll.keeper {
            payroll.set_keeper(&config.admin, Some(keeper))?;
        }
        let airdrop = Airdrop::new(config.admin, config.airdrop_minter, ledger.clone());

        info!(admin = %config.admin, simulated = simulated.is_some(), "genesis state created");
        Ok(Self {
            ledger,
            payment,
            vesting,
            payroll,
            airdrop,
            clock,
            simulated,
        })
    }

    /// Rebuild handles from a snapshot
    pub fn restore(snapshot: StateSnapshot, config: &ScorchConfig) -> CliResult<Self> {
        if snapshot.version != STATE_VERSION {
            return Err(CliError::Other(format!(
                "unsupported state version {} (expected {})",
                snapshot.version, STATE_VERSION
            )));
        }
        let (clock, simulated) = snapshot.clock.build();
        let ledger = Arc::new(Ledger::from_state(snapshot.ledger)?);
        let payment = Arc::new(InMemoryPaymentAsset::from_state(snapshot.payment)?);
        let vesting =
            VestingSchedule::from_state(snapshot.vesting, ledger.clone(), payment.clone(), clock.clone())?;
        let payroll = Payroll::from_state(snapshot.payroll, ledger.clone(), clock.clone())?;
        let airdrop = Airdrop::new(config.admin, config.airdrop_minter, ledger.clone());
        Ok(Self {
            ledger,
            payment,
            vesting,
            payroll,
            airdrop,
            clock,
            simulated,
        })
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn clock_state(&self) -> ClockState {
        ClockState {
            mode: if self.simulated.is_some() {
                ClockMode::Simulated
            } else {
                ClockMode::Wall
            },
            last_seen: self.clock.now(),
        }
    }

    /// Move a simulated clock forward to `to` (admin only)
    pub fn advance_clock(&self, caller: &Address, to: Timestamp) -> CliResult<Timestamp> {
        let Some(manual) = &self.simulated else {
            return Err(CliError::InvalidArgument(
                "this deployment runs on wall time; its clock cannot be set".into(),
            ));
        };
        if *caller != self.ledger.admin() {
            return Err(CliError::Unauthorized(format!("{} cannot move the clock", caller)));
        }
        let now = manual.now();
        if to < now {
            return Err(CliError::InvalidArgument(format!(
                "clock cannot move backwards ({} < {})",
                to, now
            )));
        }
        manual.set(to);
        info!(from = now, to, "simulated clock advanced");
        Ok(to)
    }

    pub fn snapshot(&self) -> CliResult<StateSnapshot> {
        Ok(StateSnapshot {
            version: STATE_VERSION,
            clock: self.clock_state(),
            ledger: self.ledger.snapshot(),
            vesting: self.vesting.snapshot()?,
            payment: self.payment.snapshot(),
            payroll: self.payroll.snapshot()?,
        })
    }
}

pub fn load_state(path: &Path) -> CliResult<StateSnapshot> {
    if !path.exists() {
        return Err(CliError::StateNotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|e| CliError::StateLoadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let snapshot = serde_json::from_str(&raw).map_err(|e| CliError::StateLoadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), "state loaded");
    Ok(snapshot)
}

pub fn save_state(path: &Path, snapshot: &StateSnapshot) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), "state saved");
    Ok(())
}
