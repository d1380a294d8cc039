//! Request routing.
//!
//! Matches a request path against the fixed set of endpoints:
//! - `GET /health`
//! - `GET /metrics`
//! - `GET {route_root}/{width}/{height}/{image path...}`

/// Endpoint selected for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Health,
    Metrics,
    Transform {
        width: String,
        height: String,
        image_path: String,
    },
    NotFound,
}

/// Match `method` and the raw URI `path` against the known endpoints.
///
/// `route_root` is the normalized prefix (`""` or `/prefix`). The path is
/// percent-decoded before matching so image names may contain escaped
/// characters.
pub fn match_route(route_root: &str, method: &str, path: &str) -> Route {
    if method != "GET" {
        return Route::NotFound;
    }

    let decoded = match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => return Route::NotFound,
    };

    match decoded.as_str() {
        "/health" => return Route::Health,
        "/metrics" => return Route::Metrics,
        _ => {}
    }

    let Some(rest) = decoded.strip_prefix(route_root) else {
        return Route::NotFound;
    };
    let Some(rest) = rest.strip_prefix('/') else {
        return Route::NotFound;
    };

    let mut segments = rest.splitn(3, '/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(width), Some(height), Some(image_path)) if !image_path.is_empty() => {
            Route::Transform {
                width: width.to_string(),
                height: height.to_string(),
                image_path: image_path.to_string(),
            }
        }
        _ => Route::NotFound,
    }
}
