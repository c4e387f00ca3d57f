//! Command handlers
//!
//! Each handler loads the state snapshot through [`CommandContext`], runs
//! one engine operation and saves the snapshot only if the operation
//! succeeded.

pub mod distribution;
pub mod keeper;
pub mod presale;
pub mod token;

use std::path::PathBuf;

use tracing::{debug, info};

use lib_types::Address;

use crate::argument_parsing::{AdvanceClockArgs, ScorchCli, ScorchCommand};
use crate::cli_config::ScorchConfig;
use crate::error::{CliError, CliResult};
use crate::output::Output;
use crate::state::{load_state, save_state, ScorchSystem};

/// Resolved per-invocation settings
///
/// The clock is not part of the context: it comes from the state file.
pub struct CommandContext {
    pub config: ScorchConfig,
    pub state_path: PathBuf,
}

impl CommandContext {
    pub fn new(cli: &ScorchCli, config: &ScorchConfig) -> Self {
        Self {
            config: config.clone(),
            state_path: config.resolve_state_path(cli.state.as_deref()),
        }
    }

    pub fn load(&self) -> CliResult<ScorchSystem> {
        let snapshot = load_state(&self.state_path)?;
        ScorchSystem::restore(snapshot, &self.config)
    }

    pub fn save(&self, system: &ScorchSystem) -> CliResult<()> {
        save_state(&self.state_path, &system.snapshot()?)
    }

    /// Load, run `op`, and persist the result if `op` succeeded
    pub fn apply<T>(&self, op: impl FnOnce(&ScorchSystem) -> CliResult<T>) -> CliResult<T> {
        let system = self.load()?;
        let result = op(&system)?;
        self.save(&system)?;
        Ok(result)
    }

    /// Read-only access; nothing is written back
    pub fn inspect<T>(&self, op: impl FnOnce(&ScorchSystem) -> CliResult<T>) -> CliResult<T> {
        let system = self.load()?;
        op(&system)
    }

    pub fn admin_or(&self, caller: Option<Address>) -> Address {
        caller.unwrap_or(self.config.admin)
    }

    /// Explicit caller, then the configured keeper, then the admin
    pub fn operator_or(&self, caller: Option<Address>) -> Address {
        caller
            .or(self.config.payroll.keeper)
            .unwrap_or(self.config.admin)
    }
}

pub async fn execute(cli: &ScorchCli, config: &ScorchConfig, output: &dyn Output) -> CliResult<()> {
    let ctx = CommandContext::new(cli, config);
    debug!(state = %ctx.state_path.display(), command = ?cli.command, "executing");

    match &cli.command {
        ScorchCommand::Init { force } => init(&ctx, *force, output),
        ScorchCommand::Status => token::status(&ctx, output),
        ScorchCommand::AdvanceClock(args) => advance_clock(&ctx, args, output),
        ScorchCommand::Balance { address } => token::balance(&ctx, address, output),
        ScorchCommand::Mint(args) => token::mint(&ctx, args, output),
        ScorchCommand::Transfer(args) => token::transfer(&ctx, args, output),
        ScorchCommand::Burn(args) => token::burn(&ctx, args, output),
        ScorchCommand::AddMinter(args) => token::add_minter(&ctx, args, output),
        ScorchCommand::RemoveMinter(args) => token::remove_minter(&ctx, args, output),
        ScorchCommand::WithdrawStuck(args) => token::withdraw_stuck(&ctx, args, output),
        ScorchCommand::Start(args) => presale::start(&ctx, args, output),
        ScorchCommand::Purchase(args) => presale::purchase(&ctx, args, output),
        ScorchCommand::Claim { beneficiary } => presale::claim(&ctx, beneficiary, output),
        ScorchCommand::Releasable { beneficiary } => presale::releasable(&ctx, beneficiary, output),
        ScorchCommand::AdvancePhase(args) => presale::advance_phase(&ctx, args, output),
        ScorchCommand::FundPayment(args) => presale::fund_payment(&ctx, args, output),
        ScorchCommand::Airdrop(args) => distribution::airdrop(&ctx, args, output),
        ScorchCommand::AddTier(args) => distribution::add_tier(&ctx, args, output),
        ScorchCommand::UpdateTier(args) => distribution::update_tier(&ctx, args, output),
        ScorchCommand::RemoveTier(args) => distribution::remove_tier(&ctx, args, output),
        ScorchCommand::AddEmployee(args) => distribution::add_employee(&ctx, args, output),
        ScorchCommand::RemoveEmployee(args) => distribution::remove_employee(&ctx, args, output),
        ScorchCommand::SetKeeper(args) => distribution::set_keeper(&ctx, args, output),
        ScorchCommand::DistributeSalary(args) => distribution::distribute_salary(&ctx, args, output),
        ScorchCommand::Keeper(args) => keeper::run_keeper(&ctx, args, output).await,
    }
}

fn init(ctx: &CommandContext, force: bool, output: &dyn Output) -> CliResult<()> {
    if ctx.state_path.exists() && !force {
        return Err(CliError::StateExists(ctx.state_path.clone()));
    }
    let system = ScorchSystem::genesis(&ctx.config)?;
    ctx.save(&system)?;
    info!(path = %ctx.state_path.display(), "state initialized");
    output.success(&format!("Initialized state at {}", ctx.state_path.display()))
}

fn advance_clock(ctx: &CommandContext, args: &AdvanceClockArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    let now = ctx.apply(|system| system.advance_clock(&caller, args.to))?;
    output.success(&format!("Clock now at {}", now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::MockOutput;
    use clap::Parser;

    fn parse(state: &std::path::Path, args: &[&str]) -> ScorchCli {
        let mut argv = vec![
            "scorch-cli".to_string(),
            "--state".to_string(),
            state.display().to_string(),
        ];
        argv.extend(args.iter().map(|s| s.to_string()));
        ScorchCli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_init_then_status() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let config = ScorchConfig::default();
        let output = MockOutput::new();

        execute(&parse(&state, &["init"]), &config, &output).await.unwrap();
        output.assert_printed("Initialized state");

        execute(&parse(&state, &["status"]), &config, &output).await.unwrap();
        output.assert_printed("\"status\": \"Not started\"");
        assert!(output.errors().is_empty());
    }

    #[test]
    fn test_caller_defaults() {
        let mut config = ScorchConfig::default();
        let cli = parse(std::path::Path::new("s.json"), &["status"]);
        let ctx = CommandContext::new(&cli, &config);
        assert_eq!(ctx.admin_or(None), config.admin);
        assert_eq!(ctx.operator_or(None), config.admin);

        config.payroll.keeper = Some(Address::repeat(0x42));
        let ctx = CommandContext::new(&cli, &config);
        assert_eq!(ctx.operator_or(None), Address::repeat(0x42));
        assert_eq!(ctx.operator_or(Some(Address::repeat(1))), Address::repeat(1));
    }
}
