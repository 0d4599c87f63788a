//! CLI command definitions for the `startstop` binary.

pub mod plan;
pub mod render;
pub mod up;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Bring a tree of shell-command steps up and down.
#[derive(Parser)]
#[command(name = "startstop", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export lifecycle spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the stages a run walks, without running anything.
    Plan {
        #[command(flatten)]
        source: ManifestArgs,
    },

    /// Start every step, wait for Ctrl-C, then stop every step.
    Up {
        #[command(flatten)]
        source: ManifestArgs,

        /// Stop right after the start run instead of waiting for Ctrl-C.
        #[arg(long)]
        once: bool,
    },
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Path to the TOML manifest.
    #[arg(short, long, env = "STARTSTOP_MANIFEST", default_value = "startstop.toml")]
    pub manifest: PathBuf,
}

impl Cli {
    /// Fallback log filter for the chosen verbosity; `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,startstop_core=debug",
            _ => "trace",
        }
    }
}
