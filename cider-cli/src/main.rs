//! Cider CLI: load, validate and inspect Cider datasets from the terminal.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use cider_core::DatasetKind;

/// Cider: validate and normalize telecom and survey datasets
#[derive(Parser, Debug)]
#[command(name = "cider", version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", env = "CIDER_CONFIG")]
    config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Load datasets from their configured files and print a summary
    Load {
        /// Dataset kinds (e.g. cdr, antennas, survey_data)
        #[arg(required = true)]
        kinds: Vec<DatasetKind>,
    },
    /// Load features and labels and join them
    Merge,
    /// Load time-indexed datasets and keep rows within a date range
    Filter {
        /// First day to keep (YYYY-MM-DD)
        #[arg(long)]
        from: chrono::NaiveDate,
        /// Last day to keep (YYYY-MM-DD)
        #[arg(long)]
        to: chrono::NaiveDate,
        #[arg(required = true)]
        kinds: Vec<DatasetKind>,
    },
    /// Load time-indexed datasets and drop duplicate records
    Dedup {
        #[arg(required = true)]
        kinds: Vec<DatasetKind>,
    },
    /// Show the schema contract of a dataset kind (all kinds if omitted)
    Schema { kind: Option<DatasetKind> },
    /// Show the resolved configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let stderr_layer = if cli.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };
    tracing_subscriber::registry().with(stderr_layer).init();

    commands::handle_command(cli.command, &cli.config, cli.json)
}
