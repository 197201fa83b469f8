//! DCA ladder bot - main entry point
//!
//! Two subcommands:
//! - run: execute one invocation of the strategy (the scheduler calls this)
//! - status: print the persisted state without touching the exchange

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "dca-ladder")]
#[command(about = "Multi-level DCA entry bot with per-level take-profit and a global trailing stop", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one strategy invocation
    Run {
        /// Path to strategy configuration file
        #[arg(short, long, default_value = "configs/strategy.json")]
        config: String,

        /// Path to the persisted state file
        #[arg(short, long, default_value = "state.json")]
        state: String,
    },

    /// Print the persisted state
    Status {
        /// Path to the persisted state file
        #[arg(short, long, default_value = "state.json")]
        state: String,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy HTTP internals
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::debug!("Log file: {}", log_path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Run { .. } => "run",
        Commands::Status { .. } => "status",
    };
    setup_logging(cli.verbose, command_name)?;

    let result = match cli.command {
        Commands::Run { config, state } => commands::run::run(config, state),
        Commands::Status { state } => commands::status::run(state),
    };

    // Non-zero exit signals the scheduler that this run failed; it retries
    // on its own fixed interval.
    if let Err(ref e) = result {
        error!("invocation failed: {:#}", e);
    }
    result
}
