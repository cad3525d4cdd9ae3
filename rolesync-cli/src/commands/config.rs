use std::path::Path;

use crate::config::{ConfigLoader, RolesyncConfig};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (merged, token redacted)
    Show,
    /// Show configuration file paths
    Path,
}

pub fn run(args: ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(config_path),
        ConfigCommands::Path => show_paths(config_path),
    }
}

fn show_config(config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_path(path)?,
        None => ConfigLoader::load()?,
    };
    println!("{}", render(&config)?);
    Ok(())
}

fn render(config: &RolesyncConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

fn show_paths(config_path: Option<&Path>) -> Result<()> {
    if let Some(path) = config_path {
        println!("Config file:    {}", path.display());
        return Ok(());
    }
    println!(
        "User config:    {}",
        ConfigLoader::user_config_path().display()
    );
    println!(
        "Project config: {}",
        ConfigLoader::project_config_path().display()
    );
    Ok(())
}
