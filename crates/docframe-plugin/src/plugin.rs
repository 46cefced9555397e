//! Lifecycle hooks and the docframe plugin.

use std::path::PathBuf;

use docframe_server::FrameServerConfig;

use crate::bundle::{bundle_script_path, install_bundle};
use crate::companion::{spawn_companion, CompanionHandle};
use crate::config::{Command, PluginConfig, SiteConfig};
use crate::PluginError;

/// Hooks a documentation host invokes while building or serving a site.
///
/// Hooks run in order: `on_startup`, `on_config`, `on_post_build` and,
/// for live-preview sessions, `on_serve`.
pub trait DocsPlugin: Send {
    /// Plugin identifier (e.g., "docframe")
    fn name(&self) -> &'static str;

    /// Called once with the command that started the run.
    ///
    /// `dirty` is set when the host only rebuilds changed pages.
    fn on_startup(&mut self, _command: Command, _dirty: bool) {}

    /// Adjust the site configuration before the build.
    fn on_config(&mut self, config: SiteConfig) -> Result<SiteConfig, PluginError> {
        Ok(config)
    }

    /// Called after the site has been written to `site_dir`.
    fn on_post_build(&mut self, _config: &SiteConfig) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called when the host starts serving the site.
    fn on_serve(&mut self, _config: &SiteConfig) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Embeds live component frames in documentation pages.
pub struct DocframePlugin {
    config: PluginConfig,
    root: PathBuf,
    serving: bool,
    companion: Option<CompanionHandle>,
}

impl DocframePlugin {
    /// Create the plugin for a project rooted at `root`.
    pub fn new(config: PluginConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            root: root.into(),
            serving: false,
            companion: None,
        }
    }

    /// Whether the current run is a live-preview session.
    pub fn is_serving(&self) -> bool {
        self.serving
    }

    /// Companion server configuration derived from the plugin options.
    pub fn server_config(&self, site: &SiteConfig) -> FrameServerConfig {
        let watch_paths = if self.config.watch {
            vec![self.root.join(&site.components_dir)]
        } else {
            Vec::new()
        };

        FrameServerConfig {
            host: self.config.dev_host.clone(),
            port: self.config.dev_port,
            root: self.root.clone(),
            timeout: self.config.exec_timeout(),
            watch_paths,
            ..Default::default()
        }
    }
}

impl DocsPlugin for DocframePlugin {
    fn name(&self) -> &'static str {
        "docframe"
    }

    fn on_startup(&mut self, command: Command, _dirty: bool) {
        self.serving = command == Command::Serve;
        tracing::debug!("docframe started for {:?}", command);
    }

    fn on_config(&mut self, mut config: SiteConfig) -> Result<SiteConfig, PluginError> {
        let script = bundle_script_path();
        if !config.extra_javascript.contains(&script) {
            config.extra_javascript.push(script);
        }
        Ok(config)
    }

    fn on_post_build(&mut self, config: &SiteConfig) -> Result<(), PluginError> {
        let site_dir = self.root.join(&config.site_dir);
        let base_url = self.serving.then(|| self.config.dev_base_url());

        let path = install_bundle(&site_dir, base_url.as_deref())?;
        tracing::info!("Installed client bundle at {}", path.display());
        Ok(())
    }

    fn on_serve(&mut self, config: &SiteConfig) -> Result<(), PluginError> {
        if self.companion.is_some() {
            return Ok(());
        }

        let server = self.server_config(config);
        tracing::info!(
            "Starting frame server on {}",
            self.config.dev_base_url()
        );
        self.companion = Some(spawn_companion(server)?);
        Ok(())
    }
}
