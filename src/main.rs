//! Entry point for toksync, a terminal client for a token counting service.
//!
//! This binary loads environment variables, installs logging, parses CLI
//! arguments via [`cli`], and dispatches to the appropriate subcommand handler.

mod api;
mod catalog;
mod channel;
mod cli;
mod config;
mod constants;
mod engine;
mod error;
mod events;
mod format;
mod history;
mod input;
mod output;
mod repl;
mod selection;
mod store;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Runs the toksync CLI.
///
/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments into a [`cli::Cli`] struct, and dispatches the chosen
/// subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();
    init_logging(cli.verbose);
    cli::run(cli).await
}

/// Logs go to stderr so they never mix with command output.
///
/// `TOKSYNC_LOG` takes an `EnvFilter` directive; `--verbose` overrides it.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("toksync=debug")
    } else {
        EnvFilter::try_from_env(constants::LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
