mod config;
mod cue;
mod error;
mod filter;
mod loader;
mod matching;
mod model;
mod server;
mod synthesis;

use std::fs::OpenOptions;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::{Cli, Command, Config};
use loader::DocumentLoader;
use server::GemaraServer;

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(Command::Version) = cli.command {
        println!("Gemara MCP Server {}", config::version());
        return Ok(());
    }

    let config = Config::from_cli(&cli)?;
    init_tracing(&config)?;

    info!(version = %config::version(), "starting gemara MCP server");
    info!(
        log_file = ?config.log_file,
        listen_addr = ?config.listen_addr,
        fetch_timeout_secs = config.fetch.timeout.as_secs(),
        fetch_max_retries = config.fetch.max_retries,
        max_document_bytes = config.fetch.max_document_bytes,
        "configuration loaded"
    );

    let server = GemaraServer::new(DocumentLoader::new(config.fetch.clone())?);

    if let Some(addr) = config.listen_addr.as_deref() {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = tokio::select! {
                conn = accept_until_ok(|| listener.accept(), ACCEPT_ERROR_BACKOFF) => conn,
                _ = shutdown_signal() => {
                    info!("shutdown signal received");
                    break;
                }
            };
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        tokio::select! {
            result = service.waiting() => {
                result?;
            }
            _ = shutdown_signal() => {
                info!("shutdown signal received");
            }
        }
    }

    info!("MCP server shut down");
    Ok(())
}

/// Accept the next connection. Accept errors (EMFILE, ECONNABORTED, ...) are per-connection,
/// so they are logged and the listener keeps going after a short pause.
async fn accept_until_ok<T, F, Fut>(mut accept: F, backoff: Duration) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(conn) => return conn,
            Err(e) => {
                warn!(error = %e, "failed to accept TCP connection");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// Logs go to stderr (stdout carries MCP JSON-RPC) or to `--log-file`, which also lowers the
/// default level to DEBUG.
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
                )
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
                )
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .init();
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
