//! Standalone MCP server binary exposing the Vidu nodes as tools.
//!
//! Communicates with AI clients over stdio JSON-RPC. Each tool call runs one
//! node to completion: upload, submit, poll, download.

use anyhow::{Context, Result};
use std::time::Duration;
use rmcp::{transport::stdio, ServiceExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vidunodes_lib::config::{resolve_data_dir, Credentials, Settings};
use vidunodes_lib::mcp::ViduMcp;
use vidunodes_lib::tasks::RunContext;
use vidunodes_lib::vidu::{ViduClient, CANCEL_TIMEOUT};

/// Outlasts one cancel request so interrupted polls can finish sending theirs.
const SHUTDOWN_GRACE: Duration = CANCEL_TIMEOUT.saturating_add(Duration::from_secs(1));

#[tokio::main]
async fn main() -> Result<()> {
    // Log to stderr so stdout stays clean for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let data_dir = resolve_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let settings = Settings::load(&data_dir);
    info!(base_url = %settings.base_url, output_dir = %settings.output_dir.display(), "loaded settings");

    let credentials = Credentials::load(&settings.credentials_path(&data_dir))
        .context("Vidu API key is not configured")?;
    let client = ViduClient::from_credentials(settings.base_url.clone(), &credentials);

    // Ctrl-C interrupts in-flight polls; each one sends a cancel for its task.
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling running tasks");
            trigger.cancel();
        }
    });

    let ctx = RunContext::new(client, settings.output_dir.clone())
        .with_poll(settings.poll_config())
        .with_cancel(shutdown.clone());
    let server = ViduMcp::new(ctx);

    info!("Vidu MCP server starting on stdio");

    let service = server
        .serve(stdio())
        .await
        .context("MCP server failed to start")?;

    tokio::select! {
        res = service.waiting() => { res?; }
        _ = shutdown.cancelled() => {
            // Interrupted polls need a moment to deliver their cancel requests.
            tokio::time::sleep(SHUTDOWN_GRACE).await;
            info!("shutting down");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_grace_outlasts_cancel_request() {
        assert!(SHUTDOWN_GRACE > CANCEL_TIMEOUT);
    }
}
