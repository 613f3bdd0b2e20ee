//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use ledger::{InMemoryBlockRegistry, InMemoryWalletRegistry, MetricsRegistry, NodeCrypto};

/// Shared state held by the API handlers and background tasks.
///
/// This is wrapped in an [`Arc`] and passed to request handlers via
/// Axum's `State` extractor.
pub struct AppState {
    /// Height-keyed block registry.
    pub registry: Mutex<InMemoryBlockRegistry>,
    /// Wallet registry resolving signer public keys and the node identity.
    pub wallets: InMemoryWalletRegistry,
    /// Hash + signature primitives.
    pub crypto: NodeCrypto,
    /// Metrics registry shared between the block layer and the API.
    pub metrics: Arc<MetricsRegistry>,
    /// Basic-auth user table; empty means the gateway is open.
    pub authorized_users: HashMap<String, String>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
