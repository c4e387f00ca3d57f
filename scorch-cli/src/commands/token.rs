//! Ledger commands

use serde_json::json;

use lib_tokens::{MAX_SUPPLY, TOKEN_SYMBOL};
use lib_types::Address;
use lib_vesting::PaymentAsset;

use crate::argument_parsing::{format_token_amount, BurnArgs, MintArgs, RoleArgs, TransferArgs, WithdrawArgs};
use crate::error::CliResult;
use crate::output::Output;

use super::CommandContext;

pub fn status(ctx: &CommandContext, output: &dyn Output) -> CliResult<()> {
    let summary = ctx.inspect(|system| {
        let snapshot = system.ledger.snapshot();
        let minters: Vec<String> = snapshot.roles().minters().map(|m| m.to_string()).collect();
        let (phase_index, phase) = system.vesting.current_phase()?;
        Ok(json!({
            "clock": system.clock_state(),
            "ledger": {
                "symbol": TOKEN_SYMBOL,
                "admin": snapshot.admin().to_string(),
                "total_supply": format_token_amount(snapshot.total_supply()),
                "total_burned": format_token_amount(snapshot.total_burned()),
                "mintable_supply": format_token_amount(snapshot.mintable_supply()),
                "max_supply": format_token_amount(MAX_SUPPLY),
                "minters": minters,
            },
            "presale": {
                "status": system.vesting.status()?.to_string(),
                "vesting_start_time": system.vesting.vesting_start_time()?,
                "current_phase": phase_index,
                "price": phase.price.to_string(),
                "phase_remaining": format_token_amount(phase.remaining()),
                "total_sold": format_token_amount(system.vesting.total_sold()?),
                "total_raised": system.vesting.total_raised()?.to_string(),
            },
            "payroll": {
                "keeper": system.payroll.keeper()?.map(|k| k.to_string()),
                "tiers": system.payroll.tiers()?.len(),
                "employees": system.payroll.employees()?.len(),
                "total_paid": format_token_amount(system.payroll.total_paid()?),
            },
        }))
    })?;
    output.print_json(&summary)
}

pub fn balance(ctx: &CommandContext, address: &Address, output: &dyn Output) -> CliResult<()> {
    let summary = ctx.inspect(|system| {
        let info = system.vesting.vesting_info(address)?;
        Ok(json!({
            "address": address.to_string(),
            "balance": format_token_amount(system.ledger.balance_of(address)),
            "payment_balance": system.payment.balance_of(address).to_string(),
            "vesting_total": format_token_amount(info.total_amount),
            "vesting_claimed": format_token_amount(info.claimed_amount),
            "is_minter": system.ledger.is_minter(address),
        }))
    })?;
    output.print_json(&summary)
}

pub fn mint(ctx: &CommandContext, args: &MintArgs, output: &dyn Output) -> CliResult<()> {
    ctx.apply(|system| Ok(system.ledger.mint(&args.caller, args.to, args.amount)?))?;
    output.success(&format!(
        "Minted {} {} to {}",
        format_token_amount(args.amount),
        TOKEN_SYMBOL,
        args.to
    ))
}

pub fn transfer(ctx: &CommandContext, args: &TransferArgs, output: &dyn Output) -> CliResult<()> {
    let result = ctx.apply(|system| Ok(system.ledger.transfer(args.from, args.to, args.amount)?))?;
    output.success(&format!(
        "Transferred {} {} to {} (tax burned: {}, debited: {})",
        format_token_amount(result.amount),
        TOKEN_SYMBOL,
        args.to,
        format_token_amount(result.tax),
        format_token_amount(result.total_debit)
    ))
}

pub fn burn(ctx: &CommandContext, args: &BurnArgs, output: &dyn Output) -> CliResult<()> {
    ctx.apply(|system| Ok(system.ledger.burn(&args.holder, args.amount)?))?;
    output.success(&format!("Burned {} {}", format_token_amount(args.amount), TOKEN_SYMBOL))
}

pub fn add_minter(ctx: &CommandContext, args: &RoleArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    ctx.apply(|system| Ok(system.ledger.add_minter(&caller, args.address)?))?;
    output.success(&format!("{} is a minter", args.address))
}

pub fn remove_minter(ctx: &CommandContext, args: &RoleArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    ctx.apply(|system| Ok(system.ledger.remove_minter(&caller, &args.address)?))?;
    output.success(&format!("{} is no longer a minter", args.address))
}

pub fn withdraw_stuck(ctx: &CommandContext, args: &WithdrawArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    let amount = ctx.apply(|system| Ok(system.ledger.withdraw_stuck(&caller, args.to)?))?;
    output.success(&format!(
        "Withdrew {} stuck {} to {}",
        format_token_amount(amount),
        TOKEN_SYMBOL,
        args.to
    ))
}
