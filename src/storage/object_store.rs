//! S3-compatible object store backend
//!
//! Fetches originals from a single bucket through one long-lived client
//! shared by all requests. Path-style addressing keeps MinIO-style endpoints
//! working.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;

use super::{StorageBackend, StorageError};
use crate::config::ObjectStoreConfig;

/// Provider name attached to the static credentials
const CREDENTIALS_PROVIDER: &str = "kasasagi-config";

pub struct ObjectStoreBackend {
    client: S3Client,
    bucket: String,
}

impl ObjectStoreBackend {
    /// Build the client. No request is sent until [`verify`](Self::verify)
    /// or the first fetch.
    pub async fn connect(config: &ObjectStoreConfig) -> Result<Self, StorageError> {
        if config.bucket.is_empty() {
            return Err(StorageError::Config("object store bucket is empty".to_string()));
        }

        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .endpoint_url(config.endpoint_url())
            .force_path_style(true)
            .build();

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Check that the bucket is reachable with the configured credentials
    pub async fn verify(&self) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::Transport {
                path: self.bucket.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn name(&self) -> &'static str {
        "object_store"
    }

    async fn fetch(&self, path: &str) -> Result<Bytes, StorageError> {
        if path.is_empty() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let missing_key = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false);
                let status_404 = err
                    .raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false);
                if missing_key || status_404 {
                    return Err(StorageError::NotFound(path.to_string()));
                }
                return Err(StorageError::Transport {
                    path: path.to_string(),
                    message: DisplayErrorContext(&err).to_string(),
                });
            }
        };

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Transport {
                path: path.to_string(),
                message: format!("failed to read object body: {}", e),
            })?;

        let data = body.into_bytes();
        tracing::debug!(
            bucket = %self.bucket,
            key = %path,
            bytes = data.len(),
            "Fetched original from object store"
        );
        Ok(data)
    }

    fn stores_original(&self) -> bool {
        true
    }
}
