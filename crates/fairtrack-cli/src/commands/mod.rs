//! Command implementations

mod check;
mod config;
mod distance;
mod simulate;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = load_config(cli.config.as_deref(), cli.overrides())?;

    match cli.command {
        Commands::Distance(args) => distance::execute(args, &config, &output),
        Commands::Check(args) => check::execute(args, &config, &output),
        Commands::Simulate(args) => simulate::execute(args, &config, &output),
        Commands::Config => config::execute(&config, &output),
    }
}
