use clap::Subcommand;
use dayledger_core::failure::{failure_days_in_cycle, log_failure_day};

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum FailureAction {
    /// Declare a day a failure day
    Log {
        /// What happened
        #[arg(long)]
        note: String,
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Failure days used and left in the cycle covering a day
    Allowance {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
}

pub fn run(action: FailureAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        FailureAction::Log { note, day } => {
            let day = ctx.day(day.as_deref())?;
            let failure = log_failure_day(
                &ctx.db,
                &ctx.user_id,
                day,
                &note,
                ctx.now,
                &ctx.config.rules,
            )?;
            print_json(&failure)?;
        }
        FailureAction::Allowance { day } => {
            let day = ctx.day(day.as_deref())?;
            let allowance = failure_days_in_cycle(&ctx.db, &ctx.user_id, day, &ctx.config.rules)?;
            print_json(&allowance)?;
        }
    }
    Ok(())
}
