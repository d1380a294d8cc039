//! Server configuration types.
//!
//! This module defines the server-level configuration:
//! - Address and port bindings
//! - Worker threads and the admission limit
//! - Route prefix for transform requests
//!
//! Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};

use crate::constants::{CONNECTIONS_PER_CORE, DEFAULT_ADDRESS, DEFAULT_PORT, DEFAULT_THREADS};

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// Default worker thread count
fn default_threads() -> usize {
    DEFAULT_THREADS
}

/// Admission limit scales with the host: CONNECTIONS_PER_CORE per CPU
pub(crate) fn default_max_concurrent_requests() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cpus * CONNECTIONS_PER_CORE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of worker threads (default: 4)
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Prefix in front of `/{width}/{height}/{path}` (default: none)
    #[serde(default)]
    pub route_root: String,
    /// Requests served concurrently before answering 503
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            threads: default_threads(),
            route_root: String::new(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl ServerConfig {
    /// Listen address in `host:port` form
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Route prefix with a leading slash and no trailing slash, or empty
    pub fn normalized_route_root(&self) -> String {
        let trimmed = self.route_root.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }
}
