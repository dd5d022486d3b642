//! Roadmap CLI: builds the roadmap site's data files from content sources.
//!
//! Resolves track concept references against the shared concept library,
//! indexes glossary terms against the resolved tracks, and writes the JSON
//! documents the site renders.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
