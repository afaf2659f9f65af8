//! Gas CLI - Command-line interface
//!
//! Sends measurement protocol hits from the command line.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gas_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "gas")]
#[command(about = "Send analytics hits to a measurement protocol collector")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    tracker: commands::TrackerArgs,

    /// Console log level
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    /// Also write trace-level logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_level.as_tracing_level(), cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match commands::handle_command(cli.tracker, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {e}");
            eprintln!("Error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
