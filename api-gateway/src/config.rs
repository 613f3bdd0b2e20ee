//! API gateway configuration.
//!
//! This configures the HTTP listen address, the URL prefix the API is
//! mounted under, and the optional Basic-auth user table. The underlying
//! chain configuration is taken from `ledger::NodeConfig::default()`.

use std::collections::HashMap;
use std::net::SocketAddr;

/// Configuration for the API gateway HTTP server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
    /// Prefix every route is mounted under, e.g. `"/api"`.
    /// Empty means routes are served from the root.
    pub url_prefix: String,
    /// Username -> password table for HTTP Basic auth.
    ///
    /// When empty, the gateway is open and every request is admitted.
    pub authorized_users: HashMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        // Safe to unwrap: fixed, valid address literal.
        let addr: SocketAddr = "127.0.0.1:8081"
            .parse()
            .expect("hard-coded API listen address should parse");
        Self {
            listen_addr: addr,
            url_prefix: String::new(),
            authorized_users: HashMap::new(),
        }
    }
}
