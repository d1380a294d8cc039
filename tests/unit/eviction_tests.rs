// Eviction sweep behaviour against a real cache directory

use bytes::Bytes;
use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

use kasasagi::cache::{CacheStore, EvictionSweeper};
use kasasagi::request::TransformRequest;

fn age_file(path: &Path, age: Duration) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

#[tokio::test]
async fn test_expired_entry_removed_and_fresh_entry_kept() {
    let dir = TempDir::new().unwrap();
    let store = CacheStore::new(dir.path());

    let old = store
        .store(&TransformRequest::new("old.jpg").with_size(1, 0), Bytes::from_static(b"old"))
        .await
        .unwrap()
        .into_path();
    let fresh = store
        .store(&TransformRequest::new("new.jpg").with_size(1, 0), Bytes::from_static(b"new"))
        .await
        .unwrap()
        .into_path();
    age_file(&old, Duration::from_secs(2 * 3600));

    let sweeper = EvictionSweeper::new(
        dir.path(),
        Duration::from_secs(3600),
        Duration::from_secs(60),
        Duration::ZERO,
    );
    let report = sweeper.sweep_once().await.unwrap();

    assert_eq!(report.removed, 1);
    assert_eq!(report.bytes, 3);
    assert!(!old.exists());
    assert!(fresh.exists());
}

#[tokio::test]
async fn test_evicted_entry_is_rebuilt_on_next_lookup() {
    let dir = TempDir::new().unwrap();
    let store = CacheStore::new(dir.path());
    let request = TransformRequest::new("a.png").with_size(3, 3);

    let path = store
        .store(&request, Bytes::from_static(b"x"))
        .await
        .unwrap()
        .into_path();
    age_file(&path, Duration::from_secs(120));

    let sweeper = EvictionSweeper::new(
        dir.path(),
        Duration::from_secs(60),
        Duration::from_secs(60),
        Duration::ZERO,
    );
    sweeper.sweep_once().await.unwrap();

    assert_eq!(store.lookup(&request).await.unwrap(), None);
}

#[tokio::test]
async fn test_spawned_sweeper_runs_and_stops() {
    let dir = TempDir::new().unwrap();
    let expired = dir.path().join("expired.cache");
    std::fs::write(&expired, b"stale").unwrap();
    age_file(&expired, Duration::from_secs(600));

    let handle = EvictionSweeper::new(
        dir.path(),
        Duration::from_secs(60),
        Duration::from_millis(20),
        Duration::ZERO,
    )
    .spawn();

    for _ in 0..50 {
        if !expired.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.stop().await;

    assert!(!expired.exists());
}

#[tokio::test]
async fn test_missing_directory_skips_cycle() {
    let dir = TempDir::new().unwrap();
    let sweeper = EvictionSweeper::new(
        dir.path().join("absent"),
        Duration::from_secs(1),
        Duration::from_secs(1),
        Duration::ZERO,
    );
    assert!(sweeper.sweep_once().await.is_err());
}
