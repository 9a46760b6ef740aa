//! Kavach CLI entry point.

use clap::Parser;
use colored::*;
use kavach::cli::{self, Cli, EXIT_ERROR};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let cli = Cli::parse();

    // Logs always go to stderr; stdout carries reports and hook decisions.
    let filter = match cli.verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red(), e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
