use clap::Subcommand;
use dayledger_core::actions::resolve_debt_and_refresh;
use dayledger_core::debt::{ensure_debt_for_missed_day, get_unresolved_debt};
use dayledger_core::ResolutionType;
use serde_json::json;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum DebtAction {
    /// List unresolved debts, oldest first
    List,
    /// Open the debt for a missed past day if one is owed
    Ensure {
        /// Missed day (YYYY-MM-DD)
        #[arg(long)]
        day: String,
    },
    /// Pay off a debt and refresh today's status
    Resolve {
        /// Debt ID
        id: String,
        /// How it was paid: extra_time or extra_output
        #[arg(long = "type")]
        resolution_type: String,
        /// What was done
        #[arg(long)]
        note: String,
    },
}

pub fn run(action: DebtAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DebtAction::List => {
            let debts = get_unresolved_debt(&ctx.db, &ctx.user_id)?;
            print_json(&debts)?;
        }
        DebtAction::Ensure { day } => {
            let day = ctx.day(Some(&day))?;
            let debt = ensure_debt_for_missed_day(&ctx.db, &ctx.user_id, day, ctx.now)?;
            print_json(&debt)?;
        }
        DebtAction::Resolve {
            id,
            resolution_type,
            note,
        } => {
            let resolution_type: ResolutionType = resolution_type.parse()?;
            let (debt, today) = resolve_debt_and_refresh(
                &ctx.db,
                &ctx.user_id,
                &id,
                resolution_type,
                &note,
                ctx.now,
            )?;
            print_json(&json!({ "debt": debt, "today": today }))?;
        }
    }
    Ok(())
}
