//! Content-addressed disk cache
//!
//! Artifacts live flat in one directory as `{sha256}.cache`. A file is
//! written once, through a temp file that is linked into place, and never
//! modified afterwards; the eviction sweep is the only thing that deletes.

use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::TEMP_FILE_EXTENSION;
use crate::request::TransformRequest;

pub mod eviction;
pub mod key;

pub use eviction::{format_bytes, EvictionService, EvictionSweeper, SweepReport, SweeperHandle};
pub use key::{canonical_string, CacheKey};

/// Errors raised by cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache directory {path} unavailable: {source}")]
    DirectoryUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of a store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// This call wrote the artifact
    Written(PathBuf),
    /// An artifact with the same key already existed and was left untouched
    AlreadyPresent(PathBuf),
}

impl StoreOutcome {
    pub fn path(&self) -> &Path {
        match self {
            StoreOutcome::Written(path) | StoreOutcome::AlreadyPresent(path) => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            StoreOutcome::Written(path) | StoreOutcome::AlreadyPresent(path) => path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Create the cache directory if needed
    pub async fn ensure_dir(&self) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::DirectoryUnavailable {
                path: self.dir.clone(),
                source,
            })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(&self, request: &TransformRequest) -> CacheKey {
        CacheKey::for_request(request)
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Path of the cached artifact for `request`, if present
    pub async fn lookup(&self, request: &TransformRequest) -> Result<Option<PathBuf>, CacheError> {
        self.lookup_key(&self.key(request)).await
    }

    pub async fn lookup_key(&self, key: &CacheKey) -> Result<Option<PathBuf>, CacheError> {
        let path = self.path_for(key);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Io(e)),
        }
    }

    /// Persist the encoded artifact for `request`
    pub async fn store(
        &self,
        request: &TransformRequest,
        data: Bytes,
    ) -> Result<StoreOutcome, CacheError> {
        self.store_key(&self.key(request), data).await
    }

    /// Write `data` under `key` unless an artifact already exists.
    ///
    /// The bytes go to a uniquely named temp file first and are hard-linked
    /// into place, so readers never observe a partial file and a concurrent
    /// writer's artifact is never replaced.
    pub async fn store_key(&self, key: &CacheKey, data: Bytes) -> Result<StoreOutcome, CacheError> {
        let path = self.path_for(key);
        if tokio::fs::try_exists(&path).await? {
            return Ok(StoreOutcome::AlreadyPresent(path));
        }

        let temp_path = self
            .dir
            .join(format!("{}.{}.{}", key.as_str(), uuid::Uuid::new_v4(), TEMP_FILE_EXTENSION));
        if let Err(e) = tokio::fs::write(&temp_path, &data).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(CacheError::Io(e));
        }

        let linked = tokio::fs::hard_link(&temp_path, &path).await;
        let _ = tokio::fs::remove_file(&temp_path).await;

        match linked {
            Ok(()) => {
                tracing::debug!(key = %key, bytes = data.len(), "Stored cache artifact");
                Ok(StoreOutcome::Written(path))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(StoreOutcome::AlreadyPresent(path)),
            Err(e) => Err(CacheError::Io(e)),
        }
    }
}
