mod config;
mod error;
mod gate;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use seo_common::engine::Engine;
use seo_common::error::CommonError;
use seo_common::gemini::{GeminiClient, GeminiClientConfig};

use config::Config;
use error::AppError;
use server::SeoAutopilotServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting seo-autopilot MCP server");

    let config = Config::from_env()?;
    info!(
        model = %config.model,
        max_file_bytes = config.limits.max_file_bytes,
        max_total_bytes = config.limits.max_total_bytes,
        "configuration loaded"
    );

    let gemini_config = GeminiClientConfig::from_env().map_err(AppError::from)?;
    info!(
        base_url = %gemini_config.base_url,
        timeout_ms = gemini_config.default_timeout.as_millis(),
        stream_text = gemini_config.stream_text,
        "gemini client configured"
    );
    let gemini = GeminiClient::new(gemini_config)
        .map_err(|e| AppError::from(CommonError::from(e)))?;

    let engine = Engine::new(Arc::new(gemini), config.model.clone());
    let server = SeoAutopilotServer::new(engine, config.limits);

    if let Some(addr) = config.tcp_listen_addr {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                tracing::info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                tracing::info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
