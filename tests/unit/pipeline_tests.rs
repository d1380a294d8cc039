// Pipeline scenarios across storage, transform and cache

use std::sync::Arc;
use tempfile::TempDir;

use kasasagi::error::PipelineError;
use kasasagi::pipeline::CacheStatus;
use kasasagi::request::{CoordinateMode, CropRect, MarkerPoint, TransformRequest};
use kasasagi::transform::{resolve, PixelRect};

use super::common::{pipeline_with, png_fixture, RecordingBackend};

fn dims(path: &std::path::Path) -> (u32, u32) {
    let image = image::open(path).unwrap();
    (image.width(), image.height())
}

#[tokio::test]
async fn test_produce_is_idempotent() {
    let cache_dir = TempDir::new().unwrap();
    let backend = Arc::new(RecordingBackend::new(png_fixture(120, 80)));
    let pipeline = pipeline_with(backend.clone(), cache_dir.path());

    let request = TransformRequest::new("gallery/a.png")
        .with_size(60, 0)
        .with_markers(vec![MarkerPoint::new(0.5, 0.5, 1)])
        .with_mode(CoordinateMode::NormalizedUv);

    let first = pipeline.produce(&request).await.unwrap();
    let first_bytes = std::fs::read(&first.path).unwrap();
    let second = pipeline.produce(&request).await.unwrap();
    let second_bytes = std::fs::read(&second.path).unwrap();

    assert_eq!(first.path, second.path);
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(second.status, CacheStatus::Hit);
    // The hit never touches the backend
    assert_eq!(backend.fetched().len(), 1);
}

#[tokio::test]
async fn test_rendering_is_byte_identical_across_caches() {
    let request = TransformRequest::new("a.png")
        .with_size(50, 30)
        .with_crop(CropRect::new(5.0, 5.0, 20.0, 10.0));

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let cache_dir = TempDir::new().unwrap();
        let backend = Arc::new(RecordingBackend::new(png_fixture(100, 60)));
        let pipeline = pipeline_with(backend, cache_dir.path());
        let artifact = pipeline.produce(&request).await.unwrap();
        outputs.push(std::fs::read(&artifact.path).unwrap());
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn test_uv_crop_resolves_to_exact_rectangle() {
    let crop = CropRect::new(0.5, 0.5, 0.2, 0.2);
    let rect = resolve(1000, 500, 500, 0, &crop, CoordinateMode::NormalizedUv);
    assert_eq!(rect, PixelRect::new(200, 100, 100, 50));
}

#[tokio::test]
async fn test_uv_crop_output_dimensions() {
    let cache_dir = TempDir::new().unwrap();
    let backend = Arc::new(RecordingBackend::new(png_fixture(1000, 500)));
    let pipeline = pipeline_with(backend, cache_dir.path());

    let request = TransformRequest::new("wide.png")
        .with_size(500, 0)
        .with_crop(CropRect::new(0.5, 0.5, 0.2, 0.2))
        .with_mode(CoordinateMode::NormalizedUv);
    let artifact = pipeline.produce(&request).await.unwrap();

    assert_eq!(dims(&artifact.path), (100, 50));
}

#[tokio::test]
async fn test_oversized_width_is_not_upscaled() {
    let cache_dir = TempDir::new().unwrap();
    let backend = Arc::new(RecordingBackend::new(png_fixture(80, 40)));
    let pipeline = pipeline_with(backend, cache_dir.path());

    let request = TransformRequest::new("small.png").with_size(400, 0);
    let artifact = pipeline.produce(&request).await.unwrap();

    assert_eq!(dims(&artifact.path), (80, 40));
}

#[tokio::test]
async fn test_margin_larger_than_crop_is_ignored() {
    let cache_dir = TempDir::new().unwrap();
    let backend = Arc::new(RecordingBackend::new(png_fixture(200, 200)));
    let pipeline = pipeline_with(backend, cache_dir.path());

    let crop = CropRect::new(10.0, 10.0, 60.0, 40.0);
    let cropped = TransformRequest::new("a.png").with_crop(crop);
    let oversized_margin = cropped.clone().with_margin(120, 20);
    let valid_margin = cropped.clone().with_margin(30, 0);

    let plain = pipeline.produce(&cropped).await.unwrap();
    let ignored = pipeline.produce(&oversized_margin).await.unwrap();
    let applied = pipeline.produce(&valid_margin).await.unwrap();

    assert_eq!(
        std::fs::read(&plain.path).unwrap(),
        std::fs::read(&ignored.path).unwrap()
    );
    // Distinct requests keep distinct artifacts even when bytes match
    assert_ne!(plain.path, ignored.path);
    assert_eq!(dims(&applied.path), (30, 20));
}

#[tokio::test]
async fn test_markers_skipped_when_cropped() {
    let cache_dir = TempDir::new().unwrap();
    let backend = Arc::new(RecordingBackend::new(png_fixture(100, 100)));
    let pipeline = pipeline_with(backend, cache_dir.path());

    let cropped = TransformRequest::new("a.png").with_crop(CropRect::new(0.0, 0.0, 50.0, 50.0));
    let marked = cropped.clone().with_markers(vec![
        MarkerPoint::new(25.0, 25.0, 1),
        MarkerPoint::new(10.0, 10.0, 2).with_angle(1.0),
    ]);

    let plain = pipeline.produce(&cropped).await.unwrap();
    let with_markers = pipeline.produce(&marked).await.unwrap();

    assert_eq!(
        std::fs::read(&plain.path).unwrap(),
        std::fs::read(&with_markers.path).unwrap()
    );
}

#[tokio::test]
async fn test_markers_drawn_without_crop() {
    let cache_dir = TempDir::new().unwrap();
    let backend = Arc::new(RecordingBackend::new(png_fixture(100, 100)));
    let pipeline = pipeline_with(backend, cache_dir.path());

    let resized = TransformRequest::new("a.png").with_size(80, 80);
    let marked = resized
        .clone()
        .with_markers(vec![MarkerPoint::new(40.0, 40.0, 7)]);

    let plain = pipeline.produce(&resized).await.unwrap();
    let with_markers = pipeline.produce(&marked).await.unwrap();

    assert_ne!(
        std::fs::read(&plain.path).unwrap(),
        std::fs::read(&with_markers.path).unwrap()
    );
    assert_eq!(dims(&with_markers.path), (80, 80));
}

#[tokio::test]
async fn test_traversal_segments_never_reach_storage() {
    let cache_dir = TempDir::new().unwrap();
    let backend = Arc::new(RecordingBackend::new(png_fixture(20, 20)));
    let pipeline = pipeline_with(backend.clone(), cache_dir.path());

    let request = TransformRequest::new("../../secrets/./../x.png").with_size(10, 0);
    pipeline.produce(&request).await.unwrap();

    assert_eq!(backend.fetched(), vec!["secrets/x.png".to_string()]);
}

#[tokio::test]
async fn test_object_store_parameterless_request_uses_cache() {
    let cache_dir = TempDir::new().unwrap();
    let backend = Arc::new(RecordingBackend::new(png_fixture(30, 20)));
    let pipeline = pipeline_with(backend, cache_dir.path());

    let artifact = pipeline.produce(&TransformRequest::new("a.png")).await.unwrap();

    assert_eq!(artifact.status, CacheStatus::Miss);
    assert!(artifact.path.starts_with(cache_dir.path()));
    assert_eq!(dims(&artifact.path), (30, 20));
}

#[tokio::test]
async fn test_backend_errors_surface_as_404() {
    let cache_dir = TempDir::new().unwrap();
    let backend = Arc::new(RecordingBackend::new(png_fixture(10, 10)));
    let pipeline = pipeline_with(backend, cache_dir.path());

    let missing = pipeline
        .produce(&TransformRequest::new("missing.png").with_size(5, 0))
        .await
        .unwrap_err();
    assert!(matches!(missing, PipelineError::NotFound(_)));

    let offline = pipeline
        .produce(&TransformRequest::new("offline.png").with_size(5, 0))
        .await
        .unwrap_err();
    assert!(matches!(offline, PipelineError::StorageTransport(_)));
    assert_eq!(offline.to_http_status(), 404);
    assert!(!offline.public_message().contains("refused"));
}

#[tokio::test]
async fn test_undecodable_source_is_400() {
    let cache_dir = TempDir::new().unwrap();
    let backend = Arc::new(RecordingBackend::new(b"definitely not an image".to_vec()));
    let pipeline = pipeline_with(backend, cache_dir.path());

    let err = pipeline
        .produce(&TransformRequest::new("a.jpg").with_size(5, 0))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ImageDecode(_)));
    assert_eq!(err.to_http_status(), 400);
    assert_eq!(std::fs::read_dir(cache_dir.path()).unwrap().count(), 0);
}
