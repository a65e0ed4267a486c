//! Nagios check for the public `PagerDuty` status page
//!
//! Prints one status message and exits 0 (OK), 1 (WARNING) or 3 (UNKNOWN).

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pagerduty::config::DEFAULT_STATUS_URL;
use pagerduty::status::{self, StatusClient};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pd-status")]
#[command(about = "Monitor PagerDuty status for outages")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Status document URL
    #[arg(long, env = "PD_STATUS_URL", default_value = DEFAULT_STATUS_URL)]
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current status and exit with its Nagios code
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Show => match StatusClient::new(&cli.url, Duration::from_secs(cli.timeout)) {
            Ok(client) => client.check().await,
            Err(e) => {
                tracing::error!(error = %e, "Invalid status URL");
                status::unknown(&status::host_of(&cli.url))
            }
        },
    };

    println!("{}", result.message);
    ExitCode::from(u8::try_from(result.code.exit_code()).unwrap_or(3))
}
