//! Scaffold a docframe project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command in `root`.
pub fn run(root: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing docframe...");

    let files = [
        ("docframe.toml", DEFAULT_CONFIG),
        ("components/hello_world.rhai", DEFAULT_EXAMPLE),
        ("docs/hello_world.md", DEFAULT_PAGE),
    ];

    for (relative, content) in files {
        let path = root.join(relative);
        if path.exists() && !yes {
            tracing::warn!("{} already exists. Use --yes to overwrite.", relative);
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", relative))?;
        tracing::info!("Created {}", relative);
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'docframe serve' to preview your examples.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# docframe configuration

[site]
# Markdown sources
docs_dir = "docs"

# Generated site the client bundle is installed into
site_dir = "site"

# Example component scripts
components_dir = "components"

[plugin]
# Frame server address used during `docframe serve`
dev_host = "localhost"
dev_port = 5000

# Per-call execution limit for examples (0 disables it)
exec_timeout_ms = 10000

# Reload open frames when examples change
watch = true
"#;

const DEFAULT_EXAMPLE: &str = r#"// Rendered by <docframe-frame file="components/hello_world.rhai">
run(|| h1("Hello World"));
"#;

const DEFAULT_PAGE: &str = r#"# Hello World

The simplest possible example: a script that registers a component
rendering a single heading.

<docframe-frame file="components/hello_world.rhai"></docframe-frame>
"#;
