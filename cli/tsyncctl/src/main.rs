//! tsyncctl - operator CLI for tsync
//!
//! Dry-runs the profile selection against local declaration and node files,
//! and inspects documents published by the controller.

use anyhow::Result;
use clap::Parser;

mod commands;
mod error;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
