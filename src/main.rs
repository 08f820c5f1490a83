mod cli;
mod config;
mod report;

use clap::Parser;
use cli::{run, Cli};
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins unless --verbose asks for every propagation step.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let output = run(&cli)?;
    print!("{output}");

    Ok(())
}
