//! Live preview command.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::services::ServeDir;

use docframe_plugin::{DocframePlugin, Host};

/// Run the serve command.
pub async fn run(config: &Path, port: u16, dev_port: Option<u16>, open: bool) -> Result<()> {
    let (root, mut file) = super::load(config)?;
    if let Some(dev_port) = dev_port {
        file.plugin.dev_port = dev_port;
    }

    let mut host = Host::new(&root, file.site)
        .with_plugin(DocframePlugin::new(file.plugin, &root));
    let report = host.serve()?;
    let dir = report.site_dir;

    let addr: SocketAddr = format!("127.0.0.1:{}", port)
        .parse()
        .context("Invalid address")?;

    tracing::info!("Serving {} at http://{}", dir.display(), addr);

    let app = Router::new().fallback_service(ServeDir::new(&dir));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    if open {
        let url = format!("http://{}", addr);
        if let Err(e) = open::that(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    axum::serve(listener, app).await?;

    Ok(())
}
