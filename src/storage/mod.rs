//! Storage backends for original images
//!
//! A [`StorageBackend`] fetches raw bytes by logical path. One backend is
//! selected at startup from configuration and shared read-only by every
//! request.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::config::StorageConfig;

pub mod filesystem;
pub mod object_store;

pub use filesystem::FilesystemBackend;
pub use object_store::ObjectStoreBackend;

/// Errors returned by storage backends
#[derive(Error, Debug)]
pub enum StorageError {
    /// Original does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend could not be reached or answered with an unexpected error
    #[error("transport error for {path}: {message}")]
    Transport { path: String, message: String },

    /// Backend is misconfigured
    #[error("storage configuration error: {0}")]
    Config(String),
}

/// Source of original images
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Backend name for logs and metrics
    fn name(&self) -> &'static str;

    /// Fetch the raw bytes stored under a sanitized logical path
    async fn fetch(&self, path: &str) -> Result<Bytes, StorageError>;

    /// True when originals are only reachable through the backend, so even
    /// parameter-less requests must go through the cache pipeline
    fn stores_original(&self) -> bool;

    /// Local file serving the original untouched, if the backend has one.
    ///
    /// Backends without local files return `Ok(None)`.
    async fn original_path(&self, _path: &str) -> Result<Option<PathBuf>, StorageError> {
        Ok(None)
    }
}

/// Build the configured backend.
///
/// The object store is probed once; an unreachable store is a startup
/// failure.
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    if config.use_object_store {
        let store_config = config.object_store.as_ref().ok_or_else(|| {
            StorageError::Config("object_store section missing".to_string())
        })?;
        let backend = ObjectStoreBackend::connect(store_config).await?;
        backend.verify().await?;
        tracing::info!(
            bucket = %store_config.bucket,
            endpoint = %store_config.endpoint_url(),
            "Using object store backend"
        );
        Ok(Arc::new(backend))
    } else {
        let backend = FilesystemBackend::new(&config.root);
        tracing::info!(root = %config.root, "Using filesystem backend");
        Ok(Arc::new(backend))
    }
}
