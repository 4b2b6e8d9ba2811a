//! Schedule block commands.
//!
//! Block CRUD normally lives with the schedule owner; these cover what the
//! engine needs to be driven from a shell.

use clap::Subcommand;
use dayledger_core::actions::toggle_block;
use dayledger_core::annotations::{log_resistance, set_next_action};
use dayledger_core::time::time_string_to_minutes;
use dayledger_core::{BlockCategory, NewBlock};

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum BlockAction {
    /// Add a schedule block
    Add {
        /// Block name
        name: String,
        /// Start time (HH:MM)
        #[arg(long)]
        start: String,
        /// End time (HH:MM)
        #[arg(long)]
        end: String,
        /// Category (e.g. CoreWork, Health)
        #[arg(long, default_value = "CoreWork")]
        category: String,
        /// Make the block optional instead of mandatory
        #[arg(long)]
        optional: bool,
    },
    /// List blocks by start time
    List,
    /// Mark a block done for a day, or undo it
    Toggle {
        /// Block ID
        id: String,
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Record why a mandatory block was skipped
    Resist {
        /// Block ID
        id: String,
        #[arg(long)]
        reason: String,
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Set the first concrete step for a block before it starts
    NextAction {
        /// Block ID
        id: String,
        /// The step
        text: String,
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// List next actions for a day
    NextActions {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
}

pub fn run(action: BlockAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        BlockAction::Add {
            name,
            start,
            end,
            category,
            optional,
        } => {
            let block = NewBlock {
                name,
                start_minute: time_string_to_minutes(&start)?,
                end_minute: time_string_to_minutes(&end)?,
                category: category.parse::<BlockCategory>()?,
                mandatory: !optional,
            };
            print_json(&ctx.db.insert_block(&ctx.user_id, &block, ctx.now)?)?;
        }
        BlockAction::List => {
            print_json(&ctx.db.blocks(&ctx.user_id)?)?;
        }
        BlockAction::Toggle { id, day } => {
            let day = ctx.day(day.as_deref())?;
            let toggle = toggle_block(&ctx.db, &ctx.config, &ctx.user_id, &id, day, ctx.now)?;
            print_json(&toggle)?;
        }
        BlockAction::Resist { id, reason, day } => {
            let day = ctx.day(day.as_deref())?;
            print_json(&log_resistance(&ctx.db, &ctx.user_id, &id, day, &reason, ctx.now)?)?;
        }
        BlockAction::NextAction { id, text, day } => {
            let day = ctx.day(day.as_deref())?;
            print_json(&set_next_action(&ctx.db, &ctx.user_id, &id, day, &text, ctx.now)?)?;
        }
        BlockAction::NextActions { day } => {
            let day = ctx.day(day.as_deref())?;
            print_json(&ctx.db.next_actions_for_day(&ctx.user_id, day)?)?;
        }
    }
    Ok(())
}
