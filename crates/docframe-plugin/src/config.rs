//! Plugin and site configuration (`docframe.toml`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::PluginError;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "docframe.toml";

/// Documentation generator command that started the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Build,
    GhDeploy,
    Serve,
}

/// The host's site configuration, as seen by plugins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Markdown sources
    pub docs_dir: PathBuf,

    /// Generated site
    pub site_dir: PathBuf,

    /// Example component scripts
    pub components_dir: PathBuf,

    /// Scripts added to every page
    pub extra_javascript: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
            site_dir: PathBuf::from("site"),
            components_dir: PathBuf::from("components"),
            extra_javascript: Vec::new(),
        }
    }
}

/// Plugin options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PluginConfig {
    /// Host the companion server binds to during `serve`
    #[serde(default = "default_dev_host")]
    pub dev_host: String,

    /// Port the companion server binds to during `serve`
    #[serde(default = "default_dev_port")]
    pub dev_port: u16,

    /// Per-call execution limit for examples; 0 disables it
    #[serde(default = "default_exec_timeout_ms")]
    pub exec_timeout_ms: u64,

    /// Reload open frames when example files change
    #[serde(default = "default_true")]
    pub watch: bool,
}

fn default_dev_host() -> String {
    "localhost".to_string()
}
fn default_dev_port() -> u16 {
    5000
}
fn default_exec_timeout_ms() -> u64 {
    10_000
}
fn default_true() -> bool {
    true
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            dev_host: default_dev_host(),
            dev_port: default_dev_port(),
            exec_timeout_ms: default_exec_timeout_ms(),
            watch: default_true(),
        }
    }
}

impl PluginConfig {
    /// Origin of the companion server as seen from the docs page.
    pub fn dev_base_url(&self) -> String {
        format!("http://{}:{}", self.dev_host, self.dev_port)
    }

    /// Execution limit, `None` when disabled.
    pub fn exec_timeout(&self) -> Option<Duration> {
        (self.exec_timeout_ms > 0).then(|| Duration::from_millis(self.exec_timeout_ms))
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub plugin: PluginConfig,
}

/// Load configuration from `path` if it exists, defaults otherwise.
/// Returns an error if the file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile, PluginError> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path).map_err(|e| PluginError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let config: ConfigFile = toml::from_str(&content).map_err(|e| PluginError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}
