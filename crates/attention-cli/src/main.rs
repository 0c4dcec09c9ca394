//! Attention Gate CLI - confirm the user is looking at the screen.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{Cli, Commands, ExitCode};
use config::AppConfig;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::Error.into();
        }
    };

    let exit_code = match cli.command {
        Some(Commands::Watch(args)) => watch(args, &config),
        Some(Commands::Config) => match commands::config::run(&config) {
            Ok(()) => ExitCode::Success,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::Error
            }
        },
        None => {
            // Default behavior: run watch with flattened args
            if cli.watch.frames.is_none() {
                eprintln!("error: No frame directory specified. Use --help for usage information.");
                return ExitCode::Error.into();
            }
            watch(cli.watch, &config)
        }
    };

    exit_code.into()
}

fn watch(args: commands::watch::WatchArgs, config: &AppConfig) -> ExitCode {
    let args = commands::watch::WatchArgs::with_config(args, config);
    match commands::watch::run(&args, config) {
        Ok(result) => result.exit_code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::Error
        }
    }
}
