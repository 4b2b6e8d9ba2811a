use clap::Subcommand;
use dayledger_core::insights::{compute_weekly_insights, refresh_weekly_insights, stored_weekly_insights};

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum InsightsAction {
    /// Compute insights for a week without saving them
    Compute {
        /// Any day of the week (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Compute and save the week's snapshot
    Refresh {
        /// Any day of the week (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Show the saved snapshot, if any
    Show {
        /// Any day of the week (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
}

pub fn run(action: InsightsAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        InsightsAction::Compute { day } => {
            let day = ctx.day(day.as_deref())?;
            print_json(&compute_weekly_insights(&ctx.db, &ctx.user_id, day)?)?;
        }
        InsightsAction::Refresh { day } => {
            let day = ctx.day(day.as_deref())?;
            print_json(&refresh_weekly_insights(&ctx.db, &ctx.user_id, day, ctx.now)?)?;
        }
        InsightsAction::Show { day } => {
            let day = ctx.day(day.as_deref())?;
            print_json(&stored_weekly_insights(&ctx.db, &ctx.user_id, day)?)?;
        }
    }
    Ok(())
}
