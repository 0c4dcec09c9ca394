//! CLI command definitions and handlers.

pub mod config;
pub mod watch;

use clap::{Parser, Subcommand};

/// Attention Gate - confirm the user is looking before a round starts
#[derive(Parser)]
#[command(name = "attention-gate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared watch arguments (frames, thresholds, stop conditions).
    #[command(flatten)]
    pub watch: watch::WatchArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a detection session and print one JSON line per frame
    Watch(watch::WatchArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Attention confirmed, or frames processed without a gate.
    Success,
    /// The session ran but attention was never confirmed.
    NotAttentive,
    /// Fatal session error or invalid usage.
    Error,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Success => Self::SUCCESS,
            ExitCode::NotAttentive => Self::from(1),
            ExitCode::Error => Self::from(2),
        }
    }
}
