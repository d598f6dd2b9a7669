//! Bybit webhook receiver.
//!
//! Main entry point. Loads configuration, builds the verification pipeline,
//! and serves until a shutdown signal arrives.

use std::sync::Arc;

use anyhow::{Context, Result};
use bywire_api::{start_server, AppState, Config, LogSink};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config.rust_log);

    info!("Starting Bybit webhook receiver");

    let addr = config.parse_server_addr()?;
    let verifier = config.to_verifier()?;
    let allowlist = config.to_allowlist()?;
    info!(
        server_addr = %addr,
        tolerance_ms = config.bybit_timestamp_tolerance_ms,
        allowed_ranges = allowlist.networks().len(),
        queue = %config.bybit_broker_queue,
        "Configuration loaded"
    );

    let state = AppState::new(verifier)
        .with_sink(Arc::new(LogSink::new(config.bybit_broker_queue.clone())))
        .with_allowlist(allowlist);

    start_server(state, config.to_router_config(), addr).await.context("Server failed")?;

    info!("Bybit webhook receiver shutdown complete");
    Ok(())
}

/// Initializes tracing, preferring `RUST_LOG` and falling back to the
/// configured level.
fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{default_level},bywire=debug,tower_http=debug")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
