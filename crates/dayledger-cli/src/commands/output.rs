use clap::Subcommand;
use dayledger_core::actions::{save_artifact, save_output, undo_output};
use dayledger_core::OutputType;
use serde_json::json;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum OutputAction {
    /// Save the day's output proof
    Save {
        /// TEXT, URL or FILE
        output_type: String,
        /// The text, link or file reference
        content: String,
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Withdraw the day's output
    Undo {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Record an artifact for the active goal
    Artifact {
        /// TEXT, URL or FILE
        kind: String,
        content: String,
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Set or clear the active goal artifacts are filed under
    Goal {
        /// Goal ID; omit to clear
        id: Option<String>,
    },
}

pub fn run(action: OutputAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        OutputAction::Save {
            output_type,
            content,
            day,
        } => {
            let day = ctx.day(day.as_deref())?;
            let output_type: OutputType = output_type.parse()?;
            let status = save_output(
                &ctx.db,
                &ctx.config,
                &ctx.user_id,
                day,
                output_type,
                &content,
                ctx.now,
            )?;
            print_json(&status)?;
        }
        OutputAction::Undo { day } => {
            let day = ctx.day(day.as_deref())?;
            print_json(&undo_output(&ctx.db, &ctx.user_id, day, ctx.now)?)?;
        }
        OutputAction::Artifact { kind, content, day } => {
            let day = ctx.day(day.as_deref())?;
            let kind: OutputType = kind.parse()?;
            let artifact = save_artifact(&ctx.db, &ctx.config, &ctx.user_id, day, kind, &content, ctx.now)?;
            print_json(&artifact)?;
        }
        OutputAction::Goal { id } => {
            ctx.db.set_active_goal(&ctx.user_id, id.as_deref())?;
            print_json(&json!({ "active_goal": id }))?;
        }
    }
    Ok(())
}
