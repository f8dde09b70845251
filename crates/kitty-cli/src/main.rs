//! Kitty CLI - compress files and folders into one archive and extract it
//! back, through the staging and transfer pipeline.

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let show_progress = !cli.quiet && !cli.json && progress::CliProgress::should_show();

    let (operation, result) = match &cli.command {
        cli::Commands::Compress(args) => (
            "compress",
            commands::compress::execute(args, &*formatter, show_progress),
        ),
        cli::Commands::Extract(args) => (
            "extract",
            commands::extract::execute(args, &*formatter, show_progress),
        ),
        cli::Commands::Theme(args) => ("theme", commands::theme::execute(args, &*formatter)),
        cli::Commands::Completion { shell } => {
            commands::completion::execute(*shell);
            ("completion", Ok(()))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            formatter.format_error(operation, &e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr. `--verbose` and `--quiet` override `KITTY_LOG`.
fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_env("KITTY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
