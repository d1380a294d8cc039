// Request context - per-request state carried through the HTTP front

use std::time::{Duration, Instant};
use uuid::Uuid;

use super::CacheStatus;

/// Request context that holds everything logged about one HTTP request
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    started: Instant,
    path: String,
    cache_status: Option<CacheStatus>,
    error: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Create a new context with a unique request ID (UUID v4)
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            started: Instant::now(),
            path: String::new(),
            cache_status: None,
            error: None,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn cache_status(&self) -> Option<CacheStatus> {
        self.cache_status
    }

    pub fn set_cache_status(&mut self, status: CacheStatus) {
        self.cache_status = Some(status);
    }

    /// Internal error detail, logged but never sent to the client
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
