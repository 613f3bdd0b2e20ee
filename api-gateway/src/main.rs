// api-gateway/src/main.rs

//! API gateway binary.
//!
//! This binary exposes a small HTTP API on top of the `ledger` crate:
//!
//! - `GET /health`, `GET /status`
//! - `GET /block/{block_num}`
//! - `POST /block`
//!
//! All responses use the shared JSON envelope, and the whole surface can
//! be gated behind HTTP Basic auth by populating the user table in
//! [`ApiConfig`]. It embeds an in-memory block registry seeded with a
//! signed genesis block, and a Prometheus metrics exporter on `/metrics`.

mod auth;
mod config;
mod routes;
mod state;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::signal;

use ledger::{
    Block, BlockRegistry, InMemoryBlockRegistry, InMemoryWalletRegistry, MetricsRegistry,
    NodeConfig, NodeCrypto, WalletResolver, block_version, generate_keypair,
    run_prometheus_http_server,
};

use config::ApiConfig;
use routes::{blocks, health};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "api_gateway=info,ledger=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    // For now we use default configs. These can be externalised later.
    let api_cfg = ApiConfig::default();
    let node_cfg = NodeConfig::default();

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if node_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = node_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::warn!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Node identity + genesis
    // ---------------------------

    let crypto = NodeCrypto;
    let wallets = InMemoryWalletRegistry::with_primary(generate_keypair());
    tracing::info!(
        address = %hex::encode(wallets.primary_address()),
        "node identity ready"
    );

    let mut registry = InMemoryBlockRegistry::new();
    let genesis = build_genesis(&node_cfg, &crypto, &wallets)?;
    registry.put_block(genesis);

    // ---------------------------
    // Shared state
    // ---------------------------

    let app_state: SharedState = Arc::new(AppState {
        registry: tokio::sync::Mutex::new(registry),
        wallets,
        crypto,
        metrics: metrics.clone(),
        authorized_users: api_cfg.authorized_users.clone(),
    });

    // ---------------------------
    // HTTP router
    // ---------------------------

    let api = Router::new()
        .route("/health", get(health::health))
        .route("/status", get(health::status))
        .route("/block/{block_num}", get(blocks::get_block))
        .route("/block", post(blocks::submit_block))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::require_basic_auth,
        ))
        .with_state(app_state);

    let app = if api_cfg.url_prefix.is_empty() {
        api
    } else {
        Router::new().nest(&api_cfg.url_prefix, api)
    };

    // ---------------------------
    // axum 0.8 server (hyper 1 style)
    // ---------------------------

    tracing::info!("API gateway listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    Ok(())
}

/// Builds, checksums, and signs the genesis block.
fn build_genesis(
    cfg: &NodeConfig,
    crypto: &NodeCrypto,
    wallets: &InMemoryWalletRegistry,
) -> Result<Block, String> {
    let mut genesis = Block::new(block_version::V5);
    genesis.timestamp = current_unix_timestamp();

    let checksum = genesis
        .calculate_checksum(&cfg.params.checksum_lock, crypto)
        .map_err(|e| format!("failed to compute genesis checksum: {e}"))?;
    genesis.block_checksum = Some(checksum);

    genesis
        .apply_signature(crypto, wallets)
        .map_err(|e| format!("failed to sign genesis block: {e}"))?;

    tracing::info!(
        checksum = %genesis
            .block_checksum
            .as_deref()
            .map(hex::encode)
            .unwrap_or_default(),
        "genesis block ready"
    );
    Ok(genesis)
}

/// Returns the current wall-clock time as seconds since Unix epoch.
fn current_unix_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
