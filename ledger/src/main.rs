// src/main.rs
//
// Minimal demo node that wires up the ledger library:
//
// - fresh ML-DSA-44 node identity + in-memory wallet registry
// - genesis block construction, checksum, and local signature
// - Prometheus metrics exporter on /metrics
// - a round-trip through the canonical codec as a sanity check.

use std::sync::Arc;

use ledger::{
    // Domain types
    Block,
    BlockHeader,
    // Storage + registry
    BlockRegistry,
    InMemoryBlockRegistry,
    InMemoryWalletRegistry,
    // Metrics
    MetricsRegistry,
    // Crypto seam
    NodeCrypto,
    // Top-level config
    NodeConfig,
    WalletResolver,
    block_version,
    generate_keypair,
    run_prometheus_http_server,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ledger=info".to_string()),
        )
        .init();

    if let Err(err) = run_node().await {
        eprintln!("fatal error: {err}");
        std::process::exit(1);
    }
}

async fn run_node() -> Result<(), String> {
    // For now, just use defaults. Later you can load from a file/CLI/env.
    let cfg = NodeConfig::default();

    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::warn!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Node identity
    // ---------------------------

    let crypto = NodeCrypto;
    let wallets = InMemoryWalletRegistry::with_primary(generate_keypair());
    tracing::info!(
        address = %hex::encode(wallets.primary_address()),
        "node identity ready"
    );

    // ---------------------------
    // Genesis block
    // ---------------------------

    let mut genesis = Block::new(block_version::V5);
    genesis.timestamp = current_unix_timestamp();
    genesis.add_transaction("genesis-coinbase");
    let checksum = genesis
        .calculate_checksum(&cfg.params.checksum_lock, &crypto)
        .map_err(|e| format!("failed to compute genesis checksum: {e}"))?;
    genesis.block_checksum = Some(checksum);

    genesis
        .apply_signature(&crypto, &wallets)
        .map_err(|e| format!("failed to sign genesis block: {e}"))?;
    genesis.log_block_details();

    // ---------------------------
    // Codec sanity check + store
    // ---------------------------

    let bytes = genesis.to_bytes();
    match Block::from_bytes(&bytes) {
        Ok(_) => metrics.blocks.decoded_total.inc(),
        Err(e) => {
            metrics.blocks.decode_failures_total.inc();
            return Err(format!("genesis block failed to round-trip: {e}"));
        }
    }
    let header = BlockHeader::from_block(&genesis);
    tracing::info!(
        header_bytes = header.to_bytes().len(),
        block_bytes = bytes.len(),
        "canonical encodings ready"
    );

    let mut registry = InMemoryBlockRegistry::new();
    registry.put_block(genesis);
    tracing::info!(tip = ?registry.tip(), "registry initialised");

    Ok(())
}

/// Returns the current wall-clock time as seconds since Unix epoch.
fn current_unix_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
