//! Init command

use std::fs;
use std::path::Path;

use color_eyre::eyre::{eyre, Result};
use tracing::{info, warn};

use primus_config::{Config, DEFAULT_CONFIG};

use crate::args::InitCmd;

/// Execute the init command
pub fn run(config_file: &Path, cmd: &InitCmd) -> Result<()> {
    if config_file.exists() && !cmd.overwrite {
        warn!(
            "Configuration file already exists at {}, use --overwrite to replace it",
            config_file.display()
        );
        return Ok(());
    }

    let contents = render(cmd)?;
    save(config_file, &contents)?;

    info!("Saved configuration to {}", config_file.display());
    Ok(())
}

/// The bundled sample when no chain is given, otherwise a configuration
/// built from the command line.
fn render(cmd: &InitCmd) -> Result<String> {
    if cmd.nodes.is_empty() && cmd.node_name.is_none() {
        return Ok(DEFAULT_CONFIG.to_string());
    }

    let mut config = if cmd.nodes.is_empty() {
        Config::from_toml(DEFAULT_CONFIG)?
    } else {
        Config {
            chain: cmd.nodes.clone(),
            ..Config::default()
        }
    };

    config.identity.node_name = cmd.node_name.clone();
    config.validate()?;

    Ok(config.to_toml()?)
}

fn save(path: &Path, data: &str) -> Result<()> {
    if let Some(parent_dir) = path.parent() {
        fs::create_dir_all(parent_dir).map_err(|e| {
            eyre!(
                "Failed to create parent directory {}: {e:?}",
                parent_dir.display()
            )
        })?;
    }

    fs::write(path, data)
        .map_err(|e| eyre!("Failed to write configuration to {}: {e:?}", path.display()))
}
