//! stub-recorder: a recording reverse proxy.
//!
//! Forwards every request to a real API and records each exchange as a
//! WireMock-style stub mapping through the mock server's admin API.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server ──▶ body capture ──▶ recording transport ──▶ upstream API
//!                                                        │
//!     Client ◀──────────── response (body restored) ◀────┤
//!                                                        ▼
//!                                              recording queue (detached)
//!                                                        │
//!                                   sanitizer → mapping builder → admin client ──▶ mock server
//!                                                                   (PUT file, POST mapping)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use stub_recorder::config::resolve_config;
use stub_recorder::http::HttpServer;
use stub_recorder::lifecycle::{signals, Shutdown};
use stub_recorder::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "stub-recorder")]
#[command(about = "Reverse proxy that records upstream traffic as mock server stubs", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "RECORDER_CONFIG")]
    config: Option<PathBuf>,

    /// Override listener.bind_address (e.g. 0.0.0.0:8888).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = resolve_config(cli.config.as_deref(), |key| std::env::var(key).ok())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "stub-recorder starting");

    tracing::info!(
        environment = %config.environment,
        bind_address = %config.listener.bind_address,
        target = %config.upstream.target_url,
        admin = %config.mock_server.admin_url,
        "Configuration loaded"
    );
    if config.is_development() {
        tracing::info!(config = ?config, "Resolved configuration");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
