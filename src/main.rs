//! Grid bot - main entry point
//!
//! This binary provides two subcommands:
//! - backtest: Replay historical candles through one grid configuration
//! - analyze: Sweep grid bounds and level counts over the same candles

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use grid_bot::Money;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "grid-bot")]
#[command(about = "Grid trading engine with OHLC backtesting and parameter analysis", long_about = None)]
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
    /// Run a grid backtest
    Backtest {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/grid.json")]
        config: String,

        /// Lower grid bound
        #[arg(long)]
        lower: Option<Money>,

        /// Upper grid bound
        #[arg(long)]
        upper: Option<Money>,

        /// Number of grid levels
        #[arg(long)]
        levels: Option<usize>,

        /// Investment in base currency
        #[arg(long)]
        investment: Option<Money>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Sub-candle path step
        #[arg(long)]
        price_step: Option<Money>,

        /// Sell the remaining inventory after the last candle
        #[arg(long)]
        sell_at_end: bool,

        /// Write the full result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find the most profitable grid parameters for a candle series
    Analyze {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/grid.json")]
        config: String,

        /// Bound increments per price range
        #[arg(long)]
        divisions: Option<u32>,

        /// Number of top results to show
        #[arg(short, long)]
        top: Option<usize>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Sub-candle path step
        #[arg(long)]
        price_step: Option<Money>,

        /// Write the ranked results as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if file_only {
        // For analysis: only log to file, keep console clean for progress bar
        let file_appender = tracing_appender::rolling::never("logs", &log_filename);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        let file_appender = tracing_appender::rolling::never("logs", &log_filename);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Backtest { .. } => ("backtest", false),
        Commands::Analyze { .. } => ("analyze", true), // File-only for clean progress bar
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Backtest {
            config,
            lower,
            upper,
            levels,
            investment,
            start,
            end,
            price_step,
            sell_at_end,
            output,
        } => commands::backtest::run(
            config,
            commands::backtest::Overrides {
                lower,
                upper,
                levels,
                investment,
                start,
                end,
                price_step,
                sell_at_end,
            },
            output,
        ),

        Commands::Analyze {
            config,
            divisions,
            top,
            start,
            end,
            price_step,
            output,
        } => commands::analyze::run(
            config,
            commands::analyze::Overrides {
                divisions,
                top,
                start,
                end,
                price_step,
            },
            output,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_with_console_and_file() {
        setup_logging(true, "logging_test", false).unwrap();
        info!("console and file layers installed");
        assert!(std::path::Path::new("logs").is_dir());
    }
}
