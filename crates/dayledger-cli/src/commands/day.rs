use clap::Subcommand;
use dayledger_core::actions::{summarize_day, view_today};
use dayledger_core::recompute_day;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum DayAction {
    /// Recompute a day's completion state
    Recompute {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Recompute a day and classify its outcome
    Summary {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Today's status, open debts and daily-win state
    Today,
}

pub fn run(action: DayAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DayAction::Recompute { day } => {
            let day = ctx.day(day.as_deref())?;
            let status = recompute_day(&ctx.db, &ctx.user_id, day, ctx.now)?;
            print_json(&status)?;
        }
        DayAction::Summary { day } => {
            let day = ctx.day(day.as_deref())?;
            let summary = summarize_day(&ctx.db, &ctx.config, &ctx.user_id, day, ctx.now)?;
            print_json(&summary)?;
        }
        DayAction::Today => {
            let view = view_today(&ctx.db, &ctx.config, &ctx.user_id, ctx.now)?;
            print_json(&view)?;
        }
    }
    Ok(())
}
