//! Payroll keeper loop
//!
//! Calls `distribute_salary` on a fixed period. A failed run is logged and
//! retried on the next tick; the loop only stops on Ctrl-C or after
//! `--runs` iterations.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::argument_parsing::KeeperArgs;
use crate::error::{CliError, CliResult};
use crate::output::Output;

use super::distribution::report_run;
use super::CommandContext;

/// Outcome counters of a keeper session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeeperStats {
    pub runs: u64,
    pub failures: u64,
}

pub async fn run_keeper(ctx: &CommandContext, args: &KeeperArgs, output: &dyn Output) -> CliResult<()> {
    let period = args.interval.unwrap_or(ctx.config.payroll.interval_secs);
    if period == 0 {
        return Err(CliError::InvalidArgument("keeper interval must be > 0".into()));
    }
    let caller = ctx.operator_or(args.caller);
    info!(caller = %caller, period, "keeper started");

    let stats = keeper_loop(ctx, caller, Duration::from_secs(period), args.runs, output).await;
    info!(runs = stats.runs, failures = stats.failures, "keeper stopped");
    output.print(&format!(
        "Keeper stopped after {} run(s), {} failure(s)",
        stats.runs, stats.failures
    ))
}

pub async fn keeper_loop(
    ctx: &CommandContext,
    caller: lib_types::Address,
    period: Duration,
    max_runs: Option<u64>,
    output: &dyn Output,
) -> KeeperStats {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stats = KeeperStats::default();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                stats.runs += 1;
                match ctx.apply(|system| Ok(system.payroll.distribute_salary(&caller)?)) {
                    Ok(run) => {
                        if let Err(e) = report_run(&run, output) {
                            warn!(error = %e, "failed to report payroll run");
                        }
                    }
                    Err(e) => {
                        stats.failures += 1;
                        warn!(error = %e, run = stats.runs, "payroll run failed; retrying next tick");
                        if let Err(e) = output.error(&format!("Payroll run {} failed: {}", stats.runs, e)) {
                            warn!(error = %e, "failed to report payroll failure");
                        }
                    }
                }
                if max_runs.is_some_and(|max| stats.runs >= max) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
        }
    }
    stats
}
