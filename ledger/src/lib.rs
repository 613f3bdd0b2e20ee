//! Ledger block layer.
//!
//! This crate provides the block data model and the canonical
//! serialization/checksum layer of a distributed ledger node:
//!
//! - wire primitives for the canonical byte format (`codec`),
//! - hash and signature primitives behind a small interface (`crypto`),
//! - signer identifiers and address derivation (`address`),
//! - blocks, block headers, and superblock segments (`types`),
//! - the wallet registry interface (`wallet`),
//! - an in-memory block registry (`storage`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! Higher-level binaries compose these pieces; consensus rules, PoW
//! verification, and networking live elsewhere.

pub mod address;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod types;
pub mod wallet;

// Re-export top-level configuration types.
pub use config::{ChainParams, MetricsConfig, NodeConfig};

// Re-export the collaborator seams.
pub use crypto::{CryptoAdapter, NodeCrypto, NodeKeypair, generate_keypair};
pub use wallet::{InMemoryWalletRegistry, Wallet, WalletResolver};

// Re-export the error type and storage backends.
pub use error::BlockError;
pub use storage::{BlockRegistry, InMemoryBlockRegistry};

// Re-export metrics registry and exporter.
pub use metrics::{BlockMetrics, MetricsRegistry, run_prometheus_http_server};

// Re-export domain types at the crate root for convenience.
pub use types::*;
