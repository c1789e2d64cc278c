//! Kiln command-line entry point.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use kiln::cli::{self, Cli};
use kiln::logger;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    kiln::core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    cli::run(&cli)
}
