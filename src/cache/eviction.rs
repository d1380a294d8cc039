//! Cache eviction sweep
//!
//! A single periodic task scans the cache directory and deletes `*.cache`
//! artifacts whose modification time is older than the configured TTL.
//! Temp files orphaned by an interrupted write (`*.tmp`) expire the same way.
//! A failed directory scan skips the cycle; a failed delete skips the entry.

use async_trait::async_trait;
use pingora_core::server::ShutdownWatch;
use pingora_core::services::background::BackgroundService;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::CacheError;
use crate::config::CacheConfig;
use crate::constants::{CACHE_FILE_EXTENSION, TEMP_FILE_EXTENSION};
use crate::metrics::Metrics;

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Cache artifacts inspected
    pub scanned: usize,
    /// Artifacts deleted
    pub removed: usize,
    /// Bytes freed by the deleted artifacts
    pub bytes: u64,
    /// Expired artifacts that could not be deleted
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct EvictionSweeper {
    dir: PathBuf,
    ttl: Duration,
    interval: Duration,
    initial_delay: Duration,
}

impl EvictionSweeper {
    pub fn new(dir: impl AsRef<Path>, ttl: Duration, interval: Duration, initial_delay: Duration) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            ttl,
            interval,
            initial_delay,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            &config.dir,
            config.ttl(),
            config.sweep_interval(),
            config.initial_delay(),
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Run one sweep over the cache directory
    pub async fn sweep_once(&self) -> Result<SweepReport, CacheError> {
        let mut report = SweepReport::default();
        let now = SystemTime::now();

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|source| CacheError::DirectoryUnavailable {
                path: self.dir.clone(),
                source,
            })?;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to read cache directory entry");
                    break;
                }
            };

            let path = entry.path();
            if !is_sweepable(&path) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable cache entry");
                    continue;
                }
            };
            report.scanned += 1;

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            // A modification time in the future counts as fresh
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= self.ttl {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    report.removed += 1;
                    report.bytes += metadata.len();
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::debug!(path = %path.display(), error = %e, "Failed to remove expired cache entry");
                }
            }
        }

        Ok(report)
    }

    /// Sweep after the initial delay, then once per interval, until
    /// `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(
            dir = %self.dir.display(),
            ttl_secs = self.ttl.as_secs(),
            interval_secs = self.interval.as_secs(),
            initial_delay_secs = self.initial_delay.as_secs(),
            "Started cache eviction sweeper"
        );

        tokio::select! {
            _ = tokio::time::sleep(self.initial_delay) => {}
            _ = &mut shutdown => {
                tracing::debug!("Cache eviction sweeper shutting down");
                return;
            }
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_cycle().await,
                _ = &mut shutdown => {
                    tracing::debug!("Cache eviction sweeper shutting down");
                    break;
                }
            }
        }
    }

    async fn run_cycle(&self) {
        match self.sweep_once().await {
            Ok(report) => {
                Metrics::global().record_sweep(report.removed as u64, report.bytes);
                if report.removed > 0 || report.failed > 0 {
                    tracing::info!(
                        scanned = report.scanned,
                        removed = report.removed,
                        failed = report.failed,
                        freed = %format_bytes(report.bytes),
                        "Cache eviction sweep finished"
                    );
                } else {
                    tracing::debug!(scanned = report.scanned, "Cache eviction sweep found nothing to remove");
                }
            }
            Err(e) => {
                Metrics::global().record_sweep_failure();
                tracing::warn!(error = %e, "Cache eviction sweep skipped");
            }
        }
    }

    /// Run the sweeper on the current tokio runtime
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            self.run_until(async {
                let _ = shutdown_rx.await;
            })
            .await;
        });
        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Cache artifacts and leftover temp files
fn is_sweepable(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext == CACHE_FILE_EXTENSION || ext == TEMP_FILE_EXTENSION
    )
}

/// Stop signal for a spawned sweeper
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper and wait for it to exit
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

/// Sweeper hosted by the pingora server, stopped by its shutdown watch
pub struct EvictionService {
    sweeper: EvictionSweeper,
}

impl EvictionService {
    pub fn new(sweeper: EvictionSweeper) -> Self {
        Self { sweeper }
    }
}

#[async_trait]
impl BackgroundService for EvictionService {
    async fn start(&self, mut shutdown: ShutdownWatch) {
        self.sweeper
            .run_until(async move {
                let _ = shutdown.changed().await;
            })
            .await;
    }
}

/// Human-readable byte count with base-1024 units, e.g. `1.5 MiB`
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [&str; 6] = ["K", "M", "G", "T", "P", "E"];

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / UNIT as f64;
    let mut exp = 0;
    while value >= UNIT as f64 && exp < PREFIXES.len() - 1 {
        value /= UNIT as f64;
        exp += 1;
    }
    format!("{:.1} {}iB", value, PREFIXES[exp])
}
