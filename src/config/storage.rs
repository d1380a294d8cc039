//! Storage backend configuration types.
//!
//! Exactly one backend is selected at startup: the local filesystem by
//! default, or an S3-compatible object store when `use_object_store` is set.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_OBJECT_STORE_REGION, DEFAULT_STORAGE_ROOT};

fn default_root() -> String {
    DEFAULT_STORAGE_ROOT.to_string()
}

fn default_region() -> String {
    DEFAULT_OBJECT_STORE_REGION.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Serve originals from the object store instead of `root`
    #[serde(default)]
    pub use_object_store: bool,
    /// Root directory of the filesystem backend (default: ./storage)
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_store: Option<ObjectStoreConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            use_object_store: false,
            root: default_root(),
            object_store: None,
        }
    }
}

/// Connection parameters of an S3-compatible object store
#[derive(Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// `host:port` of the endpoint, without scheme
    pub address: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Use https for the endpoint (default: false)
    #[serde(default)]
    pub use_ssl: bool,
}

impl ObjectStoreConfig {
    /// Endpoint URL with the scheme selected by `use_ssl`.
    ///
    /// An address that already carries a scheme is used as is.
    pub fn endpoint_url(&self) -> String {
        if self.address.starts_with("http://") || self.address.starts_with("https://") {
            return self.address.clone();
        }
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}", scheme, self.address)
    }
}

// Credentials stay out of logs
impl std::fmt::Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreConfig")
            .field("address", &self.address)
            .field("bucket", &self.bucket)
            .field("access_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .field("region", &self.region)
            .field("use_ssl", &self.use_ssl)
            .finish()
    }
}
