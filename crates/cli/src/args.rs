//! Command-line interface
//!
//! The node reads its configuration from `<home>/config/config.toml`, or from
//! the file given with `--config`. Environment variables prefixed with
//! `PRIMUS__` override the file.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use directories::BaseDirs;

use primus_config::{load_config, Config, NodeConfig};

const APP_FOLDER: &str = ".primus";
const CONFIG_FILE: &str = "config.toml";

#[derive(Parser, Clone, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Home directory (default: `~/.primus`)
    #[arg(long, global = true, value_name = "HOME_DIR", env = "PRIMUS_HOME")]
    pub home: Option<PathBuf>,

    /// Config file path (default: `<home>/config/config.toml`)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log filter directives, overriding the configured level and `RUST_LOG`
    #[arg(long, global = true, value_name = "DIRECTIVES")]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug, Default, PartialEq, Eq)]
pub enum Commands {
    /// Write a default configuration file
    Init(InitCmd),

    /// Run the liveness listener and the leader election loop
    #[default]
    Start,

    /// Probe the chain once and print who is master
    Status,
}

#[derive(ClapArgs, Clone, Debug, Default, PartialEq, Eq)]
pub struct InitCmd {
    /// Chain entry, in priority order. Repeat for every node.
    ///
    /// Without any, a sample five-node chain is written.
    #[arg(long = "node", value_name = "NAME=ADDRESS", value_parser = parse_node)]
    pub nodes: Vec<NodeConfig>,

    /// Name of this node in the chain
    #[arg(long, value_name = "NAME")]
    pub node_name: Option<String>,

    /// Replace an existing configuration file
    #[arg(long)]
    pub overwrite: bool,
}

fn parse_node(s: &str) -> Result<NodeConfig, String> {
    let (name, address) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=ADDRESS, got `{s}`"))?;

    let (name, address) = (name.trim(), address.trim());
    if name.is_empty() || address.is_empty() {
        return Err(format!("expected NAME=ADDRESS, got `{s}`"));
    }

    Ok(NodeConfig {
        name: name.to_string(),
        address: address.to_string(),
    })
}

impl Args {
    pub fn new() -> Args {
        Args::parse()
    }

    /// The application home folder, `$HOME/.primus` unless `--home` is set.
    pub fn get_home_dir(&self) -> Result<PathBuf> {
        match &self.home {
            Some(path) => Ok(path.clone()),
            None => Ok(BaseDirs::new()
                .ok_or_else(|| eyre!("Could not determine home directory path"))?
                .home_dir()
                .join(APP_FOLDER)),
        }
    }

    pub fn get_config_dir(&self) -> Result<PathBuf> {
        Ok(self.get_home_dir()?.join("config"))
    }

    pub fn get_config_file_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(self.get_config_dir()?.join(CONFIG_FILE)),
        }
    }

    /// Load the configuration file, with environment overrides.
    pub fn load_config(&self) -> Result<Config> {
        let path = self.get_config_file_path()?;

        if !path.exists() {
            return Err(eyre!(
                "Configuration file not found at {}, run `primus init` first",
                path.display()
            ));
        }

        load_config(&path, None)
            .map_err(|e| eyre!("Failed to load configuration from {}: {e}", path.display()))
    }
}
