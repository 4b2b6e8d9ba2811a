use clap::{Parser, Subcommand};
use dayledger_core::{Config, ConfigError, CoreError, ValidationError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "dayledger-cli", version, about = "Dayledger CLI")]
struct Cli {
    /// Act at this local time (YYYY-MM-DDTHH:MM:SS) instead of the clock
    #[arg(long, global = true)]
    now: Option<String>,
    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    user: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Day status and the today view
    Day {
        #[command(subcommand)]
        action: commands::day::DayAction,
    },
    /// Execution debt
    Debt {
        #[command(subcommand)]
        action: commands::debt::DebtAction,
    },
    /// Failure days and the cycle allowance
    Failure {
        #[command(subcommand)]
        action: commands::failure::FailureAction,
    },
    /// Daily win configuration
    Win {
        #[command(subcommand)]
        action: commands::win::WinAction,
    },
    /// Quiet weeks
    Quiet {
        #[command(subcommand)]
        action: commands::quiet::QuietAction,
    },
    /// Streaks, rates and recovery
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Weekly insights
    Insights {
        #[command(subcommand)]
        action: commands::insights::InsightsAction,
    },
    /// Weekly review
    Review {
        #[command(subcommand)]
        action: commands::review::ReviewAction,
    },
    /// Schedule blocks and their annotations
    Block {
        #[command(subcommand)]
        action: commands::block::BlockAction,
    },
    /// Plans and plan tasks
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Daily output and goal artifacts
    Output {
        #[command(subcommand)]
        action: commands::output::OutputAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(config: Option<&Config>) {
    let fallback = config.map_or("info", |c| c.logging.filter.as_str()).to_string();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn error_code(err: &(dyn std::error::Error + 'static)) -> &'static str {
    if let Some(e) = err.downcast_ref::<CoreError>() {
        e.code()
    } else if err.is::<ValidationError>() {
        "ValidationError"
    } else if err.is::<ConfigError>() {
        "ConfigError"
    } else {
        "Error"
    }
}

fn run_with_context(command: Commands, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Day { action } => commands::day::run(action, ctx),
        Commands::Debt { action } => commands::debt::run(action, ctx),
        Commands::Failure { action } => commands::failure::run(action, ctx),
        Commands::Win { action } => commands::win::run(action, ctx),
        Commands::Quiet { action } => commands::quiet::run(action, ctx),
        Commands::Stats { action } => commands::stats::run(action, ctx),
        Commands::Insights { action } => commands::insights::run(action, ctx),
        Commands::Review { action } => commands::review::run(action, ctx),
        Commands::Block { action } => commands::block::run(action, ctx),
        Commands::Plan { action } => commands::plan::run(action, ctx),
        Commands::Output { action } => commands::output::run(action, ctx),
        Commands::Config { action } => commands::config::run(action),
    }
}

fn dispatch(cli: Cli, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        // Config edits must work even when the ledger cannot be opened
        Commands::Config { action } => commands::config::run(action),
        command => {
            let ctx = Context::new(config, cli.user, cli.now.as_deref())?;
            tracing::debug!(user = %ctx.user_id, now = %ctx.now, "ledger opened");
            run_with_context(command, &ctx)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load();
    init_tracing(config.as_ref().ok());

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| dispatch(cli, config));

    if let Err(e) = result {
        let body = serde_json::json!({
            "error": error_code(e.as_ref()),
            "message": e.to_string(),
        });
        println!("{body}");
        std::process::exit(1);
    }
}
