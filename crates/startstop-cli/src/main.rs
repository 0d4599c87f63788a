//! `startstop` entry point.
//!
//! Parses arguments, installs tracing, then dispatches to the `plan` or `up`
//! handler. A failed run surfaces as an error, so the process exits non-zero.

mod cli;
mod manifest;
mod shell;

use anyhow::Context;
use clap::Parser;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    startstop_observe::init_tracing(cli.otel, cli.log_filter())
        .context("failed to initialize tracing")?;

    let result = match cli.command {
        Commands::Plan { source } => cli::plan::handle_plan(&source.manifest, cli.json).await,
        Commands::Up { source, once } => {
            let opts = cli::up::UpOptions {
                once,
                json: cli.json,
                quiet: cli.quiet,
            };
            cli::up::handle_up(&source.manifest, opts).await
        }
    };

    startstop_observe::shutdown_tracing();
    result
}
