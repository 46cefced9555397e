//! Documentation host driving plugins over a generated site.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::{Command, SiteConfig};
use crate::plugin::DocsPlugin;
use crate::PluginError;

/// Result of a host build.
#[derive(Debug)]
pub struct BuildReport {
    /// Number of HTML pages scanned
    pub pages: usize,

    /// Number of pages that received new script tags
    pub injected: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub site_dir: PathBuf,
}

/// Runs plugin hooks and injects their scripts into the site pages.
pub struct Host {
    root: PathBuf,
    config: SiteConfig,
    plugins: Vec<Box<dyn DocsPlugin>>,
}

impl Host {
    /// Create a host for the project rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, config: SiteConfig) -> Self {
        Self {
            root: root.into(),
            config,
            plugins: Vec::new(),
        }
    }

    /// Register a plugin. Hooks run in registration order.
    pub fn with_plugin(mut self, plugin: impl DocsPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Site configuration after plugin adjustments.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Run startup, config and post-build hooks, then inject scripts.
    pub fn build(&mut self, command: Command) -> Result<BuildReport, PluginError> {
        let start = Instant::now();

        for plugin in &mut self.plugins {
            plugin.on_startup(command, false);
        }

        let mut config = self.config.clone();
        for plugin in &mut self.plugins {
            config = plugin.on_config(config)?;
            tracing::debug!("Applied config hook of {}", plugin.name());
        }
        self.config = config;

        let site_dir = self.root.join(&self.config.site_dir);
        fs::create_dir_all(&site_dir).map_err(|e| PluginError::Write {
            path: site_dir.clone(),
            message: e.to_string(),
        })?;

        for plugin in &mut self.plugins {
            plugin.on_post_build(&self.config)?;
        }

        let (pages, injected) = inject_scripts(&site_dir, &self.config.extra_javascript)?;

        Ok(BuildReport {
            pages,
            injected,
            duration_ms: start.elapsed().as_millis() as u64,
            site_dir,
        })
    }

    /// Build for live preview, then hand the site to `on_serve` hooks.
    pub fn serve(&mut self) -> Result<BuildReport, PluginError> {
        let report = self.build(Command::Serve)?;

        for plugin in &mut self.plugins {
            plugin.on_serve(&self.config)?;
        }

        Ok(report)
    }
}

/// Inject `scripts` into every HTML page under `site_dir`.
///
/// Returns the number of pages scanned and the number rewritten.
pub fn inject_scripts(site_dir: &Path, scripts: &[String]) -> Result<(usize, usize), PluginError> {
    let pages: Vec<PathBuf> = WalkDir::new(site_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("html"))
        .collect();

    let results: Vec<Result<bool, PluginError>> = pages
        .par_iter()
        .map(|page| inject_page(site_dir, page, scripts))
        .collect();

    let mut injected = 0;
    for result in results {
        if result? {
            injected += 1;
        }
    }

    tracing::info!("Injected scripts into {} of {} pages", injected, pages.len());
    Ok((pages.len(), injected))
}

fn inject_page(site_dir: &Path, page: &Path, scripts: &[String]) -> Result<bool, PluginError> {
    let html = fs::read_to_string(page).map_err(|e| PluginError::Read {
        path: page.to_path_buf(),
        message: e.to_string(),
    })?;

    let depth = page
        .strip_prefix(site_dir)
        .map(|relative| relative.components().count().saturating_sub(1))
        .unwrap_or(0);
    let prefix = "../".repeat(depth);

    match inject_into_html(&html, scripts, &prefix) {
        Some(updated) => {
            fs::write(page, updated).map_err(|e| PluginError::Write {
                path: page.to_path_buf(),
                message: e.to_string(),
            })?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Insert a script tag per entry before `</body>`, skipping scripts the
/// page already references. Returns `None` when nothing changes.
pub fn inject_into_html(html: &str, scripts: &[String], prefix: &str) -> Option<String> {
    let tags: String = scripts
        .iter()
        .map(|script| format!("{}{}", prefix, script))
        .filter(|src| !html.contains(&format!("src=\"{}\"", src)))
        .map(|src| format!("<script src=\"{}\"></script>\n", src))
        .collect();

    if tags.is_empty() {
        return None;
    }

    let mut updated = html.to_string();
    match html.rfind("</body>") {
        Some(pos) => updated.insert_str(pos, &tags),
        None => updated.push_str(&tags),
    }
    Some(updated)
}
