//! Frame server command.

use std::path::Path;

use anyhow::Result;
use docframe_plugin::DocframePlugin;
use docframe_server::FrameServer;

/// Run the frame server in the foreground.
pub async fn run(config: &Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    let (root, mut file) = super::load(config)?;
    if let Some(host) = host {
        file.plugin.dev_host = host;
    }
    if let Some(port) = port {
        file.plugin.dev_port = port;
    }

    let server = DocframePlugin::new(file.plugin, &root).server_config(&file.site);
    tracing::info!("Starting frame server on port {}", server.port);

    FrameServer::new(server).start().await?;

    Ok(())
}
