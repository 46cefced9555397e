//! CLI subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use docframe_plugin::{load_config, ConfigFile};

pub mod build;
pub mod check;
pub mod frame;
pub mod init;
pub mod serve;

/// Directory the config file lives in; paths in the config are relative to it.
pub fn project_root(config: &Path) -> PathBuf {
    match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Load the project configuration, falling back to defaults.
pub fn load(config: &Path) -> Result<(PathBuf, ConfigFile)> {
    let file = load_config(config)
        .with_context(|| format!("Failed to load {}", config.display()))?;
    Ok((project_root(config), file))
}
