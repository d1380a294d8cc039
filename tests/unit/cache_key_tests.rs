// Cache key injectivity over single-field changes

use rstest::rstest;

use kasasagi::cache::CacheKey;
use kasasagi::request::{CoordinateMode, CropRect, MarkerPoint, TransformRequest};

fn base() -> TransformRequest {
    TransformRequest::new("albums/2024/cat.jpg")
        .with_size(400, 300)
        .with_crop(CropRect::new(0.5, 0.5, 0.25, 0.25))
        .with_margin(100, 80)
        .with_mode(CoordinateMode::NormalizedUv)
        .with_markers(vec![MarkerPoint::new(0.1, 0.2, 1)])
}

#[rstest]
#[case::width(base().with_size(401, 300))]
#[case::height(base().with_size(400, 301))]
#[case::crop_x(base().with_crop(CropRect::new(0.51, 0.5, 0.25, 0.25)))]
#[case::crop_y(base().with_crop(CropRect::new(0.5, 0.49, 0.25, 0.25)))]
#[case::crop_width(base().with_crop(CropRect::new(0.5, 0.5, 0.2500001, 0.25)))]
#[case::crop_height(base().with_crop(CropRect::new(0.5, 0.5, 0.25, 0.26)))]
#[case::margin_width(base().with_margin(101, 80))]
#[case::margin_height(base().with_margin(100, 0))]
#[case::no_margin(base().with_margin(0, 0))]
#[case::mode(base().with_mode(CoordinateMode::AbsolutePixels))]
#[case::marker_x(base().with_markers(vec![MarkerPoint::new(0.11, 0.2, 1)]))]
#[case::marker_number(base().with_markers(vec![MarkerPoint::new(0.1, 0.2, 2)]))]
#[case::marker_angle(base().with_markers(vec![MarkerPoint::new(0.1, 0.2, 1).with_angle(0.0)]))]
#[case::extra_marker(base().with_markers(vec![MarkerPoint::new(0.1, 0.2, 1), MarkerPoint::new(0.1, 0.2, 1)]))]
#[case::no_markers(base().with_markers(vec![]))]
#[case::path(TransformRequest::new("albums/2024/cat.png")
    .with_size(400, 300)
    .with_crop(CropRect::new(0.5, 0.5, 0.25, 0.25))
    .with_margin(100, 80)
    .with_mode(CoordinateMode::NormalizedUv)
    .with_markers(vec![MarkerPoint::new(0.1, 0.2, 1)]))]
fn test_single_field_change_changes_key(#[case] changed: TransformRequest) {
    assert_ne!(CacheKey::for_request(&base()), CacheKey::for_request(&changed));
}

#[rstest]
#[case("albums/2024/cat.jpg")]
#[case("./albums/2024/cat.jpg")]
#[case("../albums/2024/./cat.jpg")]
#[case("/albums//2024/cat.jpg")]
fn test_equivalent_paths_share_key(#[case] path: &str) {
    let request = TransformRequest::new(path).with_size(400, 300);
    let reference = TransformRequest::new("albums/2024/cat.jpg").with_size(400, 300);
    assert_eq!(CacheKey::for_request(&request), CacheKey::for_request(&reference));
}

#[test]
fn test_key_file_name_is_fixed_width() {
    let short = CacheKey::for_request(&TransformRequest::new("a.jpg"));
    let long = CacheKey::for_request(&base());
    assert_eq!(short.as_str().len(), 64);
    assert_eq!(long.as_str().len(), 64);
    assert!(short.file_name().ends_with(".cache"));
}
