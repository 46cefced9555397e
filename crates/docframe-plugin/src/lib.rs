//! Documentation plugin embedding live docframe component demos.
//!
//! The plugin installs a client bundle into the generated site, adds it to
//! every page, and during live preview starts the companion frame server
//! the embedded `<docframe-frame>` elements load their iframes from.

use std::path::PathBuf;

pub mod bundle;
pub mod companion;
pub mod config;
pub mod host;
pub mod plugin;
pub mod project;

pub use bundle::{install_bundle, BUNDLE_DIR, BUNDLE_NAME, ORIGINAL_BASE_URL};
pub use companion::{spawn_companion, CompanionHandle};
pub use config::{load_config, Command, ConfigFile, PluginConfig, SiteConfig, CONFIG_FILE};
pub use host::{inject_scripts, BuildReport, Host};
pub use plugin::{DocframePlugin, DocsPlugin};
pub use project::{check_project, CheckError, CheckFailure, CheckReport};

/// Errors raised by plugin hooks.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("Failed to start frame server: {0}")]
    Companion(String),
}
