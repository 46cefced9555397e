//! Project check command.

use std::path::Path;

use anyhow::Result;
use docframe_core::SandboxOptions;
use docframe_plugin::check_project;

/// Run the check command, failing when any problem is found.
pub fn run(config: &Path) -> Result<()> {
    let (root, file) = super::load(config)?;
    let sandbox = SandboxOptions {
        timeout: file.plugin.exec_timeout(),
        ..Default::default()
    };

    let report = check_project(&root, &file.site, &sandbox)?;
    for failure in &report.failures {
        tracing::error!("{}", failure);
    }

    if !report.is_ok() {
        anyhow::bail!("{} problem(s) found", report.failures.len());
    }

    tracing::info!("All {} examples look good", report.examples);
    Ok(())
}
