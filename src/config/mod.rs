// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod cache;
pub mod logging;
pub mod markers;
pub mod server;
pub mod storage;

pub use cache::CacheConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use markers::MarkerConfig;
pub use server::ServerConfig;
pub use storage::{ObjectStoreConfig, StorageConfig};

/// Service configuration, built once at startup and shared read-only
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be greater than 0".to_string());
        }
        if self.server.threads == 0 {
            return Err("server.threads must be greater than 0".to_string());
        }
        if self.server.max_concurrent_requests == 0 {
            return Err("server.max_concurrent_requests must be greater than 0".to_string());
        }

        if self.cache.dir.trim().is_empty() {
            return Err("cache.dir cannot be empty".to_string());
        }
        if self.cache.eviction_enabled() && self.cache.sweep_interval_secs == 0 {
            return Err(
                "cache.sweep_interval_secs must be greater than 0 when ttl_hours is set"
                    .to_string(),
            );
        }

        if self.storage.use_object_store {
            let store = self.storage.object_store.as_ref().ok_or_else(|| {
                "storage.object_store is required when use_object_store is true".to_string()
            })?;
            for (name, value) in [
                ("address", &store.address),
                ("bucket", &store.bucket),
                ("access_key", &store.access_key),
                ("secret_key", &store.secret_key),
            ] {
                if value.trim().is_empty() {
                    return Err(format!("storage.object_store.{} cannot be empty", name));
                }
            }
        } else if self.storage.root.trim().is_empty() {
            return Err("storage.root cannot be empty".to_string());
        }

        if !(self.markers.font_size.is_finite() && self.markers.font_size > 0.0) {
            return Err("markers.font_size must be a positive number".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_can_be_loaded_from_file_path() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_yaml = r#"
server:
  address: "127.0.0.1"
  port: 8080
storage:
  root: "/srv/images"
cache:
  dir: "/var/cache/kasasagi"
  ttl_hours: 12
"#;
        temp_file.write_all(config_yaml.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.server.address, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.root, "/srv/images");
        assert_eq!(config.cache.dir, "/var/cache/kasasagi");
        assert_eq!(config.cache.ttl_hours, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_yaml_with_env("{}").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.storage.root, "./storage");
        assert_eq!(config.cache.dir, "./temp");
        assert_eq!(config.cache.ttl_hours, 24);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Config::from_file("/nonexistent/kasasagi.yaml").unwrap_err();
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_can_substitute_env_var_in_secret() {
        std::env::set_var("KASASAGI_TEST_SECRET_KEY", "s3cr3t");

        let yaml = r#"
storage:
  use_object_store: true
  object_store:
    address: "minio:9000"
    bucket: "images"
    access_key: "minio"
    secret_key: ${KASASAGI_TEST_SECRET_KEY}
"#;
        let config = Config::from_yaml_with_env(yaml).unwrap();
        assert_eq!(
            config.storage.object_store.as_ref().unwrap().secret_key,
            "s3cr3t"
        );
        assert!(config.validate().is_ok());

        std::env::remove_var("KASASAGI_TEST_SECRET_KEY");
    }

    #[test]
    fn test_env_var_substitution_fails_when_missing() {
        let yaml = r#"
cache:
  dir: ${KASASAGI_TEST_DEFINITELY_UNSET}
"#;
        let err = Config::from_yaml_with_env(yaml).unwrap_err();
        assert!(err.contains("KASASAGI_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_validation_requires_object_store_section() {
        let config = Config::from_yaml_with_env("storage:\n  use_object_store: true").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("storage.object_store"));
    }

    #[test]
    fn test_validation_rejects_empty_bucket() {
        let yaml = r#"
storage:
  use_object_store: true
  object_store:
    address: "minio:9000"
    bucket: ""
    access_key: "a"
    secret_key: "b"
"#;
        let err = Config::from_yaml_with_env(yaml).unwrap().validate().unwrap_err();
        assert!(err.contains("bucket"));
    }

    #[test]
    fn test_validation_rejects_zero_sweep_interval() {
        let config =
            Config::from_yaml_with_env("cache:\n  sweep_interval_secs: 0").unwrap();
        assert!(config.validate().is_err());

        // Allowed once eviction is off
        let config = Config::from_yaml_with_env("cache:\n  sweep_interval_secs: 0\n  ttl_hours: 0")
            .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_limits() {
        let mut config = Config::default();
        config.server.max_concurrent_requests = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.markers.font_size = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.dir = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
