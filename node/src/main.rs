// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ems_kernel::config::DEFAULT_MAX_SESSIONS;
use ems_node::config::ServerConfig;
use ems_node::diagnostics::forward_sigusr1;
use ems_node::server::Server;
use ems_node::telemetry::init_telemetry;
use ems_node::transport::{ensure_fifo, open_server_channel, remove_fifo, FifoTransport};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "ems-node")]
#[command(about = "Event reservation server reached over named pipes", long_about = None)]
struct Args {
    /// Path of the well-known server pipe; created if missing.
    pipe_path: PathBuf,

    /// Simulated state access delay, in microseconds.
    delay_us: Option<u64>,

    /// Number of worker sessions.
    #[arg(long, default_value_t = DEFAULT_MAX_SESSIONS)]
    workers: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry();
    let args = Args::parse();

    let config = ServerConfig {
        server_pipe: args.pipe_path.clone(),
        max_sessions: args.workers,
        access_delay: Duration::from_micros(args.delay_us.unwrap_or(0)),
        ..Default::default()
    };
    tracing::info!("Initializing EMS server with config: {:?}", config);

    let server = Server::new(config, FifoTransport)?;

    ensure_fifo(&args.pipe_path)
        .with_context(|| format!("failed to create server pipe {:?}", args.pipe_path))?;
    let channel = open_server_channel(&args.pipe_path)
        .await
        .with_context(|| format!("failed to open server pipe {:?}", args.pipe_path))?;

    let shutdown = CancellationToken::new();
    let _dump_listener = forward_sigusr1(server.dump_trigger())?;
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down");
            }
            shutdown.cancel();
        }
    });

    let result = server.run(channel, shutdown).await;

    if let Err(e) = remove_fifo(&args.pipe_path) {
        tracing::warn!("Failed to remove server pipe: {}", e);
    }
    result.context("server failed")
}
