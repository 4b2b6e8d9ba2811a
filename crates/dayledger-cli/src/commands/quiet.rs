use clap::Subcommand;
use dayledger_core::quiet::{can_enable_quiet_week, enable_quiet_week_checked, quiet_week_for};
use dayledger_core::time::week_start;
use serde_json::json;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum QuietAction {
    /// Enable quiet mode for the week containing a day
    Enable {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Quiet state and availability for the week containing a day
    Status {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
}

pub fn run(action: QuietAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let rules = &ctx.config.rules;
    match action {
        QuietAction::Enable { day } => {
            let day = ctx.day(day.as_deref())?;
            let week = enable_quiet_week_checked(&ctx.db, &ctx.user_id, day, ctx.now, rules)?;
            print_json(&week)?;
        }
        QuietAction::Status { day } => {
            let day = ctx.day(day.as_deref())?;
            let active = quiet_week_for(&ctx.db, &ctx.user_id, day)?;
            let available = active.is_none() && can_enable_quiet_week(&ctx.db, &ctx.user_id, day, rules)?;
            print_json(&json!({
                "week_start": week_start(day),
                "active": active,
                "can_enable": available,
            }))?;
        }
    }
    Ok(())
}
