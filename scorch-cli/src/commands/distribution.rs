//! Airdrop and payroll commands

use lib_distribution::{PayrollRun, PayrollTier};
use lib_tokens::TOKEN_SYMBOL;

use crate::argument_parsing::{
    format_token_amount, AirdropArgs, EmployeeArgs, OperatorArgs, RemoveEmployeeArgs,
    RemoveTierArgs, SetKeeperArgs, TierArgs,
};
use crate::error::CliResult;
use crate::output::Output;

use super::CommandContext;

pub fn airdrop(ctx: &CommandContext, args: &AirdropArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    let total = ctx.apply(|system| Ok(system.airdrop.distribute(&caller, &args.recipients)?))?;
    output.success(&format!(
        "Airdropped {} {} to {} recipient(s)",
        format_token_amount(total),
        TOKEN_SYMBOL,
        args.recipients.len()
    ))
}

fn tier_from(args: &TierArgs) -> PayrollTier {
    PayrollTier {
        id: args.id,
        salary: args.salary,
        interval_secs: args.interval,
    }
}

pub fn add_tier(ctx: &CommandContext, args: &TierArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    ctx.apply(|system| Ok(system.payroll.add_tier(&caller, tier_from(args))?))?;
    output.success(&format!(
        "Tier {} pays {} {} every {}s",
        args.id,
        format_token_amount(args.salary),
        TOKEN_SYMBOL,
        args.interval
    ))
}

pub fn update_tier(ctx: &CommandContext, args: &TierArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    ctx.apply(|system| Ok(system.payroll.update_tier(&caller, tier_from(args))?))?;
    output.success(&format!("Tier {} updated", args.id))
}

pub fn remove_tier(ctx: &CommandContext, args: &RemoveTierArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    ctx.apply(|system| Ok(system.payroll.remove_tier(&caller, args.id)?))?;
    output.success(&format!("Tier {} removed", args.id))
}

pub fn add_employee(ctx: &CommandContext, args: &EmployeeArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    ctx.apply(|system| Ok(system.payroll.add_employee(&caller, args.address, args.tier)?))?;
    output.success(&format!("{} added to tier {}", args.address, args.tier))
}

pub fn remove_employee(
    ctx: &CommandContext,
    args: &RemoveEmployeeArgs,
    output: &dyn Output,
) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    ctx.apply(|system| Ok(system.payroll.remove_employee(&caller, &args.address)?))?;
    output.success(&format!("{} removed from payroll", args.address))
}

pub fn set_keeper(ctx: &CommandContext, args: &SetKeeperArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.admin_or(args.caller);
    ctx.apply(|system| Ok(system.payroll.set_keeper(&caller, args.keeper)?))?;
    match args.keeper {
        Some(keeper) => output.success(&format!("Keeper set to {}", keeper)),
        None => output.success("Keeper cleared"),
    }
}

pub fn distribute_salary(ctx: &CommandContext, args: &OperatorArgs, output: &dyn Output) -> CliResult<()> {
    let caller = ctx.operator_or(args.caller);
    let run = ctx.apply(|system| Ok(system.payroll.distribute_salary(&caller)?))?;
    report_run(&run, output)
}

pub(crate) fn report_run(run: &PayrollRun, output: &dyn Output) -> CliResult<()> {
    if run.is_empty() {
        return output.print("No salaries due");
    }
    for payment in &run.payments {
        output.print(&format!(
            "  {} <- {} {} ({} interval(s))",
            payment.employee,
            format_token_amount(payment.amount),
            TOKEN_SYMBOL,
            payment.periods
        ))?;
    }
    output.success(&format!(
        "Paid {} {} to {} employee(s)",
        format_token_amount(run.total),
        TOKEN_SYMBOL,
        run.payments.len()
    ))
}
