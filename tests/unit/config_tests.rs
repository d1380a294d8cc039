// Configuration loading and validation

use kasasagi::config::{Config, LogFormat};

#[test]
fn test_full_config_parses() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 8080
  threads: 2
  route_root: "/img"
  max_concurrent_requests: 32
storage:
  use_object_store: true
  object_store:
    address: "minio:9000"
    bucket: "images"
    access_key: "key"
    secret_key: "secret"
    use_ssl: true
cache:
  dir: "/var/cache/kasasagi"
  ttl_hours: 6
  sweep_interval_secs: 600
  initial_delay_secs: 5
  coalesce_requests: false
markers:
  font_size: 20.0
logging:
  level: debug
  format: pretty
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert!(config.validate().is_ok());

    assert_eq!(config.server.normalized_route_root(), "/img");
    assert_eq!(config.server.max_concurrent_requests, 32);

    let store = config.storage.object_store.as_ref().unwrap();
    assert_eq!(store.endpoint_url(), "https://minio:9000");
    assert_eq!(store.region, "us-east-1");

    assert_eq!(config.cache.ttl().as_secs(), 6 * 3600);
    assert!(!config.cache.coalesce_requests);
    assert_eq!(config.markers.font_size, 20.0);
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = Config::from_yaml_with_env("{}").unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.server.port, 5000);
    assert!(!config.storage.use_object_store);
    assert_eq!(config.cache.dir, "./temp");
    assert!(config.cache.coalesce_requests);
}

#[test]
fn test_env_substitution_in_credentials() {
    std::env::set_var("KASASAGI_TEST_SECRET_KEY", "s3cr3t");
    let yaml = r#"
storage:
  use_object_store: true
  object_store:
    address: "localhost:9000"
    bucket: "b"
    access_key: "k"
    secret_key: "${KASASAGI_TEST_SECRET_KEY}"
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert_eq!(config.storage.object_store.unwrap().secret_key, "s3cr3t");
}

#[test]
fn test_unset_env_variable_is_error() {
    let yaml = "cache:\n  dir: \"${KASASAGI_TEST_UNSET_VARIABLE}\"\n";
    let err = Config::from_yaml_with_env(yaml).unwrap_err();
    assert!(err.contains("KASASAGI_TEST_UNSET_VARIABLE"));
}

#[test]
fn test_object_store_without_section_is_invalid() {
    let config = Config::from_yaml_with_env("storage:\n  use_object_store: true\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_ttl_disables_eviction_without_interval() {
    let yaml = "cache:\n  ttl_hours: 0\n  sweep_interval_secs: 0\n";
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert!(!config.cache.eviction_enabled());
    assert!(config.validate().is_ok());
}

#[test]
fn test_debug_output_redacts_credentials() {
    let yaml = r#"
storage:
  use_object_store: true
  object_store:
    address: "localhost:9000"
    bucket: "b"
    access_key: "AKIAEXAMPLE"
    secret_key: "very-secret"
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    let debug = format!("{:?}", config);
    assert!(!debug.contains("very-secret"));
    assert!(!debug.contains("AKIAEXAMPLE"));
}
