//! Background companion server.

use docframe_server::{FrameServer, FrameServerConfig};

use crate::PluginError;

/// Handle to a running companion server.
///
/// The server runs until the process exits; the handle only records
/// where it was started.
#[derive(Debug)]
pub enum CompanionHandle {
    /// Spawned onto the caller's tokio runtime
    Task(tokio::task::JoinHandle<()>),

    /// Running on a dedicated thread with its own runtime
    Thread(std::thread::JoinHandle<()>),
}

/// Start the companion server without blocking the caller.
///
/// Uses the current tokio runtime when there is one, otherwise starts a
/// thread with a fresh multi-threaded runtime.
pub fn spawn_companion(config: FrameServerConfig) -> Result<CompanionHandle, PluginError> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        return Ok(CompanionHandle::Task(handle.spawn(serve(config))));
    }

    let thread = std::thread::Builder::new()
        .name("docframe-companion".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!("Failed to start frame server runtime: {}", e);
                    return;
                }
            };
            runtime.block_on(serve(config));
        })
        .map_err(|e| PluginError::Companion(e.to_string()))?;

    Ok(CompanionHandle::Thread(thread))
}

async fn serve(config: FrameServerConfig) {
    if let Err(e) = FrameServer::new(config).start().await {
        tracing::error!("Frame server stopped: {}", e);
    }
}
