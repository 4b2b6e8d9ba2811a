use clap::Subcommand;
use dayledger_core::daily_win::{get_daily_win_config, is_daily_win_satisfied, set_daily_win_config};
use dayledger_core::DailyWinConfig;
use serde_json::json;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum WinAction {
    /// Show the daily-win config, defaulted when never set
    Show,
    /// Choose what counts as the daily win
    Set {
        /// output, block or either
        kind: String,
        /// Block pinned by block/either
        #[arg(long)]
        block_id: Option<String>,
    },
    /// Whether a day's win is achieved
    Check {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
}

pub fn run(action: WinAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        WinAction::Show => {
            let config = get_daily_win_config(&ctx.db, &ctx.user_id, &ctx.config.daily_win)?;
            print_json(&config)?;
        }
        WinAction::Set { kind, block_id } => {
            let config = DailyWinConfig::from_input(&kind, block_id)?;
            set_daily_win_config(&ctx.db, &ctx.user_id, &config)?;
            print_json(&config)?;
        }
        WinAction::Check { day } => {
            let day = ctx.day(day.as_deref())?;
            let config = get_daily_win_config(&ctx.db, &ctx.user_id, &ctx.config.daily_win)?;
            let satisfied = is_daily_win_satisfied(&ctx.db, &ctx.user_id, day, &config)?;
            let record = ctx.db.daily_win(&ctx.user_id, day)?;
            print_json(&json!({ "day": day, "satisfied": satisfied, "record": record }))?;
        }
    }
    Ok(())
}
