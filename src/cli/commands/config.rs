//! Implementation of the `switchyard config` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print a sample config.yaml with every default
    Sample,
}

pub fn execute(args: &ConfigArgs, config: &Config, json_mode: bool) -> Result<()> {
    let rendered = match args.command {
        ConfigCommands::Show if json_mode => {
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?
        }
        ConfigCommands::Show => {
            serde_yaml::to_string(config).context("Failed to serialize configuration")?
        }
        ConfigCommands::Sample => Config::sample_yaml(),
    };
    println!("{rendered}");
    Ok(())
}
