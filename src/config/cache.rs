//! Cache configuration types.
//!
//! Controls where artifacts are written, how long they live and whether
//! concurrent identical requests are coalesced.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_CACHE_DIR, DEFAULT_CACHE_TTL_HOURS, DEFAULT_SWEEP_INITIAL_DELAY_SECS,
    DEFAULT_SWEEP_INTERVAL_SECS,
};

fn default_dir() -> String {
    DEFAULT_CACHE_DIR.to_string()
}

fn default_ttl_hours() -> u64 {
    DEFAULT_CACHE_TTL_HOURS
}

fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

fn default_initial_delay_secs() -> u64 {
    DEFAULT_SWEEP_INITIAL_DELAY_SECS
}

fn default_coalesce_requests() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding `*.cache` artifacts (default: ./temp)
    #[serde(default = "default_dir")]
    pub dir: String,
    /// Artifact lifetime in hours; 0 disables eviction (default: 24)
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    /// Seconds between eviction sweeps (default: 3600)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Seconds before the first sweep (default: 60)
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// Collapse concurrent misses for the same key (default: true)
    #[serde(default = "default_coalesce_requests")]
    pub coalesce_requests: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            ttl_hours: default_ttl_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
            initial_delay_secs: default_initial_delay_secs(),
            coalesce_requests: default_coalesce_requests(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn eviction_enabled(&self) -> bool {
        self.ttl_hours > 0
    }
}
