//! routegen CLI: static route generation for the integration catalog.
//!
//! Turns a directory of catalog source files into the route table and data
//! artifacts the site renderer consumes.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
