use clap::Subcommand;
use dayledger_core::actions::toggle_task;
use dayledger_core::NewTask;
use serde_json::json;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Start a plan; its span is the failure-day cycle
    Create {
        /// Plan name
        name: String,
        /// First day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        start: Option<String>,
        /// Length in days
        #[arg(long, default_value = "30")]
        days: u32,
    },
    /// Add a task to a plan
    AddTask {
        /// Plan ID
        plan_id: String,
        /// Task title
        title: String,
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Make the task optional instead of mandatory
        #[arg(long)]
        optional: bool,
    },
    /// Complete a task, or undo it
    ToggleTask {
        /// Task ID
        id: String,
    },
    /// Show the plan covering a day and that day's tasks
    Show {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
}

pub fn run(action: PlanAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PlanAction::Create { name, start, days } => {
            let start = ctx.day(start.as_deref())?;
            print_json(&ctx.db.create_plan(&ctx.user_id, &name, start, days)?)?;
        }
        PlanAction::AddTask {
            plan_id,
            title,
            day,
            category,
            optional,
        } => {
            let task = NewTask {
                day: ctx.day(day.as_deref())?,
                title,
                category,
                mandatory: !optional,
            };
            print_json(&ctx.db.insert_task(&ctx.user_id, &plan_id, &task)?)?;
        }
        PlanAction::ToggleTask { id } => {
            print_json(&toggle_task(&ctx.db, &ctx.user_id, &id, ctx.now)?)?;
        }
        PlanAction::Show { day } => {
            let day = ctx.day(day.as_deref())?;
            let plan = ctx.db.plan_for_day(&ctx.user_id, day)?;
            let tasks = match &plan {
                Some(plan) => ctx.db.plan_tasks_for_day(&plan.id, day)?,
                None => Vec::new(),
            };
            print_json(&json!({ "day": day, "plan": plan, "tasks": tasks }))?;
        }
    }
    Ok(())
}
