//! Top-level configuration for a ledger node.
//!
//! This module aggregates configuration for:
//!
//! - chain parameters (the checksum domain lock),
//! - the metrics exporter (enable flag + listen address).
//!
//! The goal is to have a single `NodeConfig` struct that higher-level
//! binaries can construct from defaults, config files, or environment
//! variables as needed.

use std::net::SocketAddr;

/// Chain-wide parameters shared by every checksum computation.
#[derive(Clone, Debug)]
pub struct ChainParams {
    /// Domain-separation prefix mixed into every block and header
    /// checksum to prevent cross-protocol collisions.
    pub checksum_lock: Vec<u8>,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            checksum_lock: b"ledger-main".to_vec(),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        // Safe to unwrap: this is a fixed, valid address literal.
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a ledger node.
#[derive(Clone, Debug, Default)]
pub struct NodeConfig {
    pub params: ChainParams,
    pub metrics: MetricsConfig,
}
