//! Configuration file commands

use crate::config::Config;
use crate::output::{self, OutputFormat};
use crate::ConfigCommands;
use anyhow::{bail, Result};

pub fn handle_config_command(
    command: ConfigCommands,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Init { force } => {
            if Config::exists() && !force {
                bail!(
                    "{} already exists; use --force to overwrite it",
                    Config::config_path()?.display()
                );
            }

            let path = config.save()?;
            output::success(format!("Wrote {}", path.display()));
        }
        ConfigCommands::Show => {
            if !output::print_serialized(config, format)? {
                print!("{}", toml::to_string_pretty(config)?);
            }
        }
    }

    Ok(())
}
