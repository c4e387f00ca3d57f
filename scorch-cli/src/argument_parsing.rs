//! SCORCH CLI argument parsing
//!
//! Global flags select the config and state files; each subcommand maps to
//! one engine operation. SCORCH quantities are given in tokens and may carry
//! up to 18 decimals (`1.5`); payment quantities are raw base units.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lib_types::{Address, Amount, Timestamp, BASE_UNITS_PER_TOKEN, TOKEN_DECIMALS};

use crate::commands;
use crate::output::ConsoleOutput;

/// SCORCH token economics CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(name = "scorch-cli")]
pub struct ScorchCli {
    /// Configuration file path (defaults to ./scorch.toml when present)
    #[arg(short, long, env = "SCORCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// State snapshot path (overrides `state_path` from the config)
    #[arg(short, long, env = "SCORCH_STATE")]
    pub state: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "SCORCH_VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: ScorchCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScorchCommand {
    /// Create a fresh state file from the config
    Init {
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Show supply, presale and payroll summary
    Status,

    /// Move a simulated deployment's clock forward (admin only)
    AdvanceClock(AdvanceClockArgs),

    /// Show balances and vesting entitlement of an address
    Balance { address: Address },

    /// Mint tokens (minter only)
    Mint(MintArgs),

    /// Transfer tokens; 1% of the amount is burned on top
    Transfer(TransferArgs),

    /// Burn tokens from a holder
    Burn(BurnArgs),

    /// Grant the minter role (admin only)
    AddMinter(RoleArgs),

    /// Revoke the minter role (admin only)
    RemoveMinter(RoleArgs),

    /// Move tokens parked at the ledger's own address (admin only)
    WithdrawStuck(WithdrawArgs),

    /// Start the vesting clock (admin only)
    Start(AdminArgs),

    /// Buy presale entitlement with the payment asset
    Purchase(PurchaseArgs),

    /// Claim everything releasable for a beneficiary
    Claim { beneficiary: Address },

    /// Show how much a beneficiary could claim now
    Releasable { beneficiary: Address },

    /// Move the presale to the next phase (admin only)
    AdvancePhase(AdminArgs),

    /// Issue payment asset to an address and approve the presale for it
    FundPayment(FundPaymentArgs),

    /// Mint to a list of recipients in one atomic batch (admin only)
    Airdrop(AirdropArgs),

    /// Create a payroll tier (admin only)
    AddTier(TierArgs),

    /// Change salary or interval of a payroll tier (admin only)
    UpdateTier(TierArgs),

    /// Delete an unused payroll tier (admin only)
    RemoveTier(RemoveTierArgs),

    /// Register an employee in a tier (admin only)
    AddEmployee(EmployeeArgs),

    /// Remove an employee (admin only)
    RemoveEmployee(RemoveEmployeeArgs),

    /// Set or clear the payroll keeper (admin only)
    SetKeeper(SetKeeperArgs),

    /// Pay all due salaries once
    DistributeSalary(OperatorArgs),

    /// Run `distribute-salary` periodically until interrupted
    Keeper(KeeperArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AdminArgs {
    /// Caller address (defaults to the configured admin)
    #[arg(long)]
    pub caller: Option<Address>,
}

#[derive(Args, Debug, Clone)]
pub struct AdvanceClockArgs {
    /// New Unix timestamp; must not be earlier than the stored time
    #[arg(long)]
    pub to: Timestamp,
    #[arg(long)]
    pub caller: Option<Address>,
}

#[derive(Args, Debug, Clone)]
pub struct MintArgs {
    /// Minter address
    #[arg(long)]
    pub caller: Address,
    #[arg(long)]
    pub to: Address,
    /// Tokens, up to 18 decimals
    #[arg(long, value_parser = parse_token_amount)]
    pub amount: Amount,
}

#[derive(Args, Debug, Clone)]
pub struct TransferArgs {
    #[arg(long)]
    pub from: Address,
    #[arg(long)]
    pub to: Address,
    #[arg(long, value_parser = parse_token_amount)]
    pub amount: Amount,
}

#[derive(Args, Debug, Clone)]
pub struct BurnArgs {
    #[arg(long)]
    pub holder: Address,
    #[arg(long, value_parser = parse_token_amount)]
    pub amount: Amount,
}

#[derive(Args, Debug, Clone)]
pub struct RoleArgs {
    pub address: Address,
    #[arg(long)]
    pub caller: Option<Address>,
}

#[derive(Args, Debug, Clone)]
pub struct WithdrawArgs {
    #[arg(long)]
    pub to: Address,
    #[arg(long)]
    pub caller: Option<Address>,
}

#[derive(Args, Debug, Clone)]
pub struct PurchaseArgs {
    #[arg(long)]
    pub buyer: Address,
    /// Payment in payment-asset base units
    #[arg(long)]
    pub payment: Amount,
}

#[derive(Args, Debug, Clone)]
pub struct FundPaymentArgs {
    #[arg(long)]
    pub to: Address,
    /// Payment-asset base units
    #[arg(long)]
    pub amount: Amount,
}

#[derive(Args, Debug, Clone)]
pub struct AirdropArgs {
    /// Recipient as ADDRESS:TOKENS; repeat for each recipient
    #[arg(long = "to", value_parser = parse_recipient, required = true)]
    pub recipients: Vec<(Address, Amount)>,
    #[arg(long)]
    pub caller: Option<Address>,
}

#[derive(Args, Debug, Clone)]
pub struct TierArgs {
    #[arg(long)]
    pub id: u32,
    /// Tokens per interval
    #[arg(long, value_parser = parse_token_amount)]
    pub salary: Amount,
    /// Seconds between salaries
    #[arg(long)]
    pub interval: u64,
    #[arg(long)]
    pub caller: Option<Address>,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveTierArgs {
    pub id: u32,
    #[arg(long)]
    pub caller: Option<Address>,
}

#[derive(Args, Debug, Clone)]
pub struct EmployeeArgs {
    pub address: Address,
    #[arg(long)]
    pub tier: u32,
    #[arg(long)]
    pub caller: Option<Address>,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveEmployeeArgs {
    pub address: Address,
    #[arg(long)]
    pub caller: Option<Address>,
}

#[derive(Args, Debug, Clone)]
pub struct SetKeeperArgs {
    /// New keeper; omit to clear
    pub keeper: Option<Address>,
    #[arg(long)]
    pub caller: Option<Address>,
}

#[derive(Args, Debug, Clone)]
pub struct OperatorArgs {
    /// Caller address (defaults to the configured keeper, then the admin)
    #[arg(long)]
    pub caller: Option<Address>,
}

#[derive(Args, Debug, Clone)]
pub struct KeeperArgs {
    #[arg(long)]
    pub caller: Option<Address>,
    /// Loop period in seconds (overrides `payroll.interval_secs`)
    #[arg(long)]
    pub interval: Option<u64>,
    /// Stop after this many runs
    #[arg(long)]
    pub runs: Option<u64>,
}

/// Parse a token quantity such as `12`, `0.5` or `1_000.25` into base units
pub fn parse_token_amount(raw: &str) -> Result<Amount, String> {
    let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
    let (whole, fraction) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(format!("'{}' is not a token amount", raw));
    }
    if fraction.len() > TOKEN_DECIMALS as usize {
        return Err(format!("'{}' has more than {} decimals", raw, TOKEN_DECIMALS));
    }
    let parse = |digits: &str| -> Result<Amount, String> {
        if digits.is_empty() {
            return Ok(0);
        }
        digits
            .parse::<Amount>()
            .map_err(|e| format!("'{}' is not a token amount: {}", raw, e))
    };
    let whole_units = parse(whole)?
        .checked_mul(BASE_UNITS_PER_TOKEN)
        .ok_or_else(|| format!("'{}' is too large", raw))?;
    let padded = format!("{:0<width$}", fraction, width = TOKEN_DECIMALS as usize);
    let fraction_units = parse(&padded)?;
    whole_units
        .checked_add(fraction_units)
        .ok_or_else(|| format!("'{}' is too large", raw))
}

/// Parse `ADDRESS:TOKENS`
pub fn parse_recipient(raw: &str) -> Result<(Address, Amount), String> {
    let (address, amount) = raw
        .split_once(':')
        .ok_or_else(|| format!("'{}' is not ADDRESS:TOKENS", raw))?;
    let address = address
        .parse::<Address>()
        .map_err(|e| format!("bad address in '{}': {}", raw, e))?;
    Ok((address, parse_token_amount(amount)?))
}

/// Render base units as a decimal token string
pub fn format_token_amount(amount: Amount) -> String {
    let whole = amount / BASE_UNITS_PER_TOKEN;
    let fraction = amount % BASE_UNITS_PER_TOKEN;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0>width$}", fraction, width = TOKEN_DECIMALS as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub async fn run_cli() -> Result<()> {
    let cli = ScorchCli::parse();
    init_tracing(cli.verbose);

    let config = crate::cli_config::load_config(cli.config.as_deref())
        .context("loading configuration")?;
    commands::execute(&cli, &config, &ConsoleOutput)
        .await
        .map_err(anyhow::Error::from)
}
