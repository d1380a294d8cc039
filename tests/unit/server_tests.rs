// HTTP handling through ImageServer::handle

use std::sync::Arc;
use tempfile::TempDir;

use kasasagi::config::ServerConfig;
use kasasagi::pipeline::{CacheStatus, RequestContext};
use kasasagi::server::ImageServer;

use super::common::{pipeline_with, png_fixture, RecordingBackend};

fn server(cache_dir: &TempDir) -> ImageServer {
    let backend = Arc::new(RecordingBackend::new(png_fixture(200, 100)));
    ImageServer::new(
        &ServerConfig::default(),
        Arc::new(pipeline_with(backend, cache_dir.path())),
    )
}

#[tokio::test]
async fn test_uv_crop_request_end_to_end() {
    let cache_dir = TempDir::new().unwrap();
    let server = server(&cache_dir);

    let mut ctx = RequestContext::new();
    let response = server
        .handle("GET", "/100/0/a.png", Some("uv=1&cx=0.5&cy=0.5&cw=0.5&ch=0.5"), &mut ctx)
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, "image/png");
    let image = image::load_from_memory(&response.body).unwrap();
    assert_eq!((image.width(), image.height()), (50, 25));
}

#[tokio::test]
async fn test_second_request_is_cache_hit() {
    let cache_dir = TempDir::new().unwrap();
    let server = server(&cache_dir);

    let mut first = RequestContext::new();
    let a = server.handle("GET", "/50/50/a.png", Some("points=10_10_1"), &mut first).await;
    let mut second = RequestContext::new();
    let b = server.handle("GET", "/50/50/a.png", Some("points=10_10_1"), &mut second).await;

    assert_eq!(first.cache_status(), Some(CacheStatus::Miss));
    assert_eq!(second.cache_status(), Some(CacheStatus::Hit));
    assert_eq!(a.body, b.body);
}

#[tokio::test]
async fn test_unsupported_output_format_is_400() {
    let cache_dir = TempDir::new().unwrap();
    let server = server(&cache_dir);

    let mut ctx = RequestContext::new();
    let response = server.handle("GET", "/50/0/a.bmp", None, &mut ctx).await;

    assert_eq!(response.status, 400);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_counters() {
    let cache_dir = TempDir::new().unwrap();
    let server = server(&cache_dir);

    let mut ctx = RequestContext::new();
    server.handle("GET", "/20/0/a.png", None, &mut ctx).await;

    let mut ctx = RequestContext::new();
    let response = server.handle("GET", "/metrics", None, &mut ctx).await;

    assert_eq!(response.status, 200);
    let text = String::from_utf8(response.body.to_vec()).unwrap();
    assert!(text.contains("kasasagi_cache_lookups_total"));
}
