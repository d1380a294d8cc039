//! Filesystem storage backend
//!
//! Serves originals from a local root directory. Paths arrive sanitized, so
//! joining them under the root never escapes it.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{StorageBackend, StorageError};

pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        if path.is_empty() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(self.root.join(path))
    }
}

fn map_io_error(path: &str, err: std::io::Error) -> StorageError {
    match err.kind() {
        ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
        _ => StorageError::Transport {
            path: path.to_string(),
            message: err.to_string(),
        },
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn fetch(&self, path: &str) -> Result<Bytes, StorageError> {
        let full_path = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&full_path)
            .await
            .map_err(|e| map_io_error(path, e))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let data = tokio::fs::read(&full_path)
            .await
            .map_err(|e| map_io_error(path, e))?;
        tracing::debug!(path = %path, bytes = data.len(), "Read original from filesystem");
        Ok(Bytes::from(data))
    }

    fn stores_original(&self) -> bool {
        false
    }

    async fn original_path(&self, path: &str) -> Result<Option<PathBuf>, StorageError> {
        let full_path = self.resolve(path)?;
        match tokio::fs::metadata(&full_path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(full_path)),
            Ok(_) => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(map_io_error(path, e)),
        }
    }
}
