use clap::Subcommand;
use dayledger_core::stats::{
    block_consistency, daily_completion_stats, load_completion_rate, load_recovery_metrics,
    load_streak_metrics, output_quality_stats, time_allocation, weekly_summaries,
    weekly_time_reality,
};

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Current and longest streak of completed days
    Streak,
    /// Share of completed days over a trailing window
    Rate {
        /// Window in days, defaults to analytics.completion_window_days
        #[arg(long)]
        window: Option<u32>,
    },
    /// How quickly failure days are followed by a completed day
    Recovery,
    /// Executed, missed and recovered mandatory slots
    Allocation {
        /// Window in days, defaults to analytics.completion_window_days
        #[arg(long)]
        window: Option<u32>,
    },
    /// Planned versus executed minutes for a week
    Reality {
        /// Any day of the week (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// Per-day completion status, task counts and output excerpt
    Daily {
        /// Window in days, defaults to 30
        #[arg(long)]
        days: Option<u32>,
    },
    /// Per-category share of mandatory blocks done each day
    Consistency {
        /// Window in days, defaults to 14
        #[arg(long)]
        days: Option<u32>,
    },
    /// Goal artifacts graded shallow, standard or deep by week
    Quality {
        /// Number of weeks, defaults to 8
        #[arg(long)]
        weeks: Option<u32>,
    },
    /// Summaries of the most recently reviewed weeks
    Summaries,
}

pub fn run(action: StatsAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let today = ctx.today();
    let analytics = &ctx.config.analytics;
    match action {
        StatsAction::Streak => {
            print_json(&load_streak_metrics(&ctx.db, &ctx.user_id, today)?)?;
        }
        StatsAction::Rate { window } => {
            let rate = load_completion_rate(&ctx.db, &ctx.user_id, today, window, analytics)?;
            print_json(&rate)?;
        }
        StatsAction::Recovery => {
            print_json(&load_recovery_metrics(&ctx.db, &ctx.user_id, &ctx.config.rules)?)?;
        }
        StatsAction::Allocation { window } => {
            let window = analytics.clamp_window(window.unwrap_or(analytics.completion_window_days));
            print_json(&time_allocation(&ctx.db, &ctx.user_id, window, today)?)?;
        }
        StatsAction::Reality { day } => {
            let day = ctx.day(day.as_deref())?;
            print_json(&weekly_time_reality(&ctx.db, &ctx.user_id, day)?)?;
        }
        StatsAction::Daily { days } => {
            let stats = daily_completion_stats(&ctx.db, &ctx.user_id, today, days, analytics)?;
            print_json(&stats)?;
        }
        StatsAction::Consistency { days } => {
            print_json(&block_consistency(&ctx.db, &ctx.user_id, today, days, analytics)?)?;
        }
        StatsAction::Quality { weeks } => {
            print_json(&output_quality_stats(&ctx.db, &ctx.user_id, today, weeks, analytics)?)?;
        }
        StatsAction::Summaries => {
            print_json(&weekly_summaries(&ctx.db, &ctx.user_id)?)?;
        }
    }
    Ok(())
}
