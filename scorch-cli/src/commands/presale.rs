//! Presale and vesting commands

use serde_json::json;

use lib_tokens::TOKEN_SYMBOL;
use lib_types::Address;

use crate::argument_parsing::{format_token_amount, AdminArgs, FundPaymentArgs, PurchaseArgs};
use crate::error::CliResult;
use crate::output::Output;

use super::CommandContext;

pub fn start(ctx: &CommandContext, args: &AdminArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    let started = ctx.apply(|system| Ok(system.vesting.start(&caller)?))?;
    output.success(&format!("Vesting started at {}", started))
}

pub fn purchase(ctx: &CommandContext, args: &PurchaseArgs, output: &dyn Output) -> CliResult<()> {
    let receipt = ctx.apply(|system| Ok(system.vesting.purchase(&args.buyer, args.payment)?))?;
    output.success(&format!(
        "Purchased {} {} in phase {} (payment {}: burned {}, forwarded {})",
        format_token_amount(receipt.tokens),
        TOKEN_SYMBOL,
        receipt.phase,
        receipt.payment,
        receipt.settlement.burned,
        receipt.settlement.forwarded
    ))
}

pub fn claim(ctx: &CommandContext, beneficiary: &Address, output: &dyn Output) -> CliResult<()> {
    let claimed = ctx.apply(|system| Ok(system.vesting.claim(beneficiary)?))?;
    output.success(&format!(
        "Claimed {} {} for {}",
        format_token_amount(claimed),
        TOKEN_SYMBOL,
        beneficiary
    ))
}

pub fn releasable(ctx: &CommandContext, beneficiary: &Address, output: &dyn Output) -> CliResult<()> {
    let summary = ctx.inspect(|system| {
        let info = system.vesting.vesting_info(beneficiary)?;
        Ok(json!({
            "beneficiary": beneficiary.to_string(),
            "releasable": format_token_amount(system.vesting.releasable_amount(beneficiary)?),
            "total": format_token_amount(info.total_amount),
            "claimed": format_token_amount(info.claimed_amount),
        }))
    })?;
    output.print_json(&summary)
}

pub fn advance_phase(ctx: &CommandContext, args: &AdminArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    let phase = ctx.apply(|system| Ok(system.vesting.advance_phase(&caller)?))?;
    output.success(&format!("Presale moved to phase {}", phase))
}

/// Issue payment asset and approve the presale to spend it
pub fn fund_payment(ctx: &CommandContext, args: &FundPaymentArgs, output: &dyn Output) -> CliResult<()> {
    let spender = ctx.config.presale_minter;
    ctx.apply(|system| {
        system.payment.mint_to(args.to, args.amount)?;
        system.payment.approve(args.to, spender, args.amount)?;
        Ok(())
    })?;
    output.success(&format!(
        "Funded {} with {} payment units (approved for the presale)",
        args.to, args.amount
    ))
}
