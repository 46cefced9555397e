//! Site build command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use docframe_plugin::{Command, DocframePlugin, Host};

/// Run the build command.
pub fn run(config: &Path, site_dir: Option<PathBuf>) -> Result<()> {
    tracing::info!("Building site...");

    let (root, mut file) = super::load(config)?;
    if let Some(site_dir) = site_dir {
        file.site.site_dir = site_dir;
    }

    let mut host = Host::new(&root, file.site)
        .with_plugin(DocframePlugin::new(file.plugin, &root));
    let report = host.build(Command::Build)?;

    tracing::info!(
        "Processed {} pages ({} updated) in {}ms",
        report.pages,
        report.injected,
        report.duration_ms
    );
    tracing::info!("Output: {}", report.site_dir.display());

    Ok(())
}
