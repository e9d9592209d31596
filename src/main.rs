//! Instrumented HTTP server with MiniProfiler-style request profiling.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                 INSTRUMENTED SERVER               │
//!                         │                                                   │
//!   Inbound Request       │  ┌──────────┐   ┌──────────┐   ┌──────────────┐   │
//!   ──────────────────────┼─▶│request id│──▶│ profiler │──▶│   handlers   │───┼──▶ Upstream
//!                         │  │  layer   │   │middleware│   │ (outbound    │   │    API
//!                         │  └──────────┘   └────┬─────┘   │  interceptor)│   │
//!                         │                      │         └──────┬───────┘   │
//!                         │                      ▼                │ spans     │
//!                         │               ┌────────────┐          │           │
//!                         │               │  session   │◀─────────┘           │
//!                         │               │  registry  │                      │
//!                         │               └─────┬──────┘                      │
//!   Results Request       │                     │                             │
//!   ──────────────────────┼────────────────────▶│ results endpoint (JSON)     │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use miniprofiler_http::config::loader::load_config;
use miniprofiler_http::config::watcher::ConfigWatcher;
use miniprofiler_http::config::ProfilerConfig;
use miniprofiler_http::lifecycle::{signals, Shutdown};
use miniprofiler_http::observability::{logging, metrics};
use miniprofiler_http::HttpServer;

#[derive(Parser)]
#[command(name = "miniprofiler-http")]
#[command(about = "HTTP server that profiles outbound calls per inbound request", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the routing policy when the config file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProfilerConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("miniprofiler-http v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.endpoint,
        unprofiled_prefixes = ?config.profiling.unprofiled_prefixes,
        max_sessions = config.profiling.max_sessions,
        session_ttl_secs = config.profiling.session_ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let mut server_task = tokio::spawn(server.run(listener, config_updates, server_shutdown));
    tokio::select! {
        result = &mut server_task => {
            result??;
            return Ok(());
        }
        _ = signals::wait_for_signal() => shutdown.trigger(),
    }
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
