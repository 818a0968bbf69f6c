//! RankPool Server Binary
//!
//! Starts the TCP server for RankPool.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use rankpool::config::SyncStrategy;
use rankpool::network::Server;
use rankpool::{Config, PoolService, PoolStore};
use tracing_subscriber::{fmt, EnvFilter};

/// RankPool Server
#[derive(Parser, Debug)]
#[command(name = "rankpool-server")]
#[command(about = "Append-only numeric pools with exact percentile queries")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./rankpool_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    listen: String,

    /// Maximum connections queued for a free worker
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Worker threads serving connections
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// fsync pool files after every N appends (1 = every append)
    #[arg(short = 's', long, default_value = "16")]
    sync_every: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rankpool=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("RankPool Server v{}", rankpool::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let sync_strategy = match args.sync_every {
        0 | 1 => SyncStrategy::EveryWrite,
        count => SyncStrategy::EveryNAppends { count },
    };

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .sync_strategy(sync_strategy)
        .build();

    // Open store
    let store = match PoolStore::from_config(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open pool store: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Pool store initialized with {} pools", store.pool_count());

    let server = match Server::bind(config, PoolService::new(Arc::clone(&store))) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
    drop(server);

    // The server held the only other handle through its service
    match Arc::try_unwrap(store) {
        Ok(store) => {
            if let Err(e) = store.close() {
                tracing::error!("Failed to close pool store: {}", e);
                std::process::exit(1);
            }
        }
        Err(_) => tracing::warn!("Pool store still shared at shutdown, skipping close"),
    }

    tracing::info!("Server stopped");
}
