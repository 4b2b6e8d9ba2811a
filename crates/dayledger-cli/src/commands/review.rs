use clap::Subcommand;
use dayledger_core::review::{submit_weekly_review, weekly_review};
use dayledger_core::ReviewAnswers;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum ReviewAction {
    /// Submit this week's review (once per week)
    Submit {
        #[arg(long, default_value = "")]
        q1: String,
        #[arg(long, default_value = "")]
        q2: String,
        #[arg(long, default_value = "")]
        q3: String,
        #[arg(long, default_value = "")]
        q4: String,
        /// One habit to drop next week
        #[arg(long, default_value = "")]
        stop_doing: String,
        /// The block that met the most resistance
        #[arg(long, default_value = "")]
        resistance_block: String,
    },
    /// Show the review for the week containing a day
    Show {
        /// Any day of the week (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
}

pub fn run(action: ReviewAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ReviewAction::Submit {
            q1,
            q2,
            q3,
            q4,
            stop_doing,
            resistance_block,
        } => {
            let answers = ReviewAnswers {
                q1,
                q2,
                q3,
                q4,
                stop_doing,
                resistance_block,
            };
            print_json(&submit_weekly_review(&ctx.db, &ctx.user_id, ctx.now, answers)?)?;
        }
        ReviewAction::Show { day } => {
            let day = ctx.day(day.as_deref())?;
            print_json(&weekly_review(&ctx.db, &ctx.user_id, day)?)?;
        }
    }
    Ok(())
}
