// Pipeline module - resolves a transform request into a file on disk
//
// Order of operations for one request:
// 1. Short-circuit to the original when nothing needs rendering
// 2. Cache lookup by key
// 3. Single-flight (optional): one leader renders, followers re-check the cache
// 4. Fetch original, render, composite markers, encode
// 5. Store the artifact under its key

pub mod context;

pub use context::RequestContext;

use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{CacheKey, CacheStore, StoreOutcome};
use crate::error::PipelineError;
use crate::markers::MarkerCompositor;
use crate::metrics::Metrics;
use crate::request::TransformRequest;
use crate::request_coalescing::{CoalescingSlot, RequestCoalescer};
use crate::storage::StorageBackend;
use crate::transform::{encode, render, OutputFormat};

/// How a request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Original served without touching the cache
    Bypass,
    /// Artifact already cached
    Hit,
    /// Artifact rendered and stored by this request
    Miss,
    /// Another in-flight request rendered the artifact
    Coalesced,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Bypass => "bypass",
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Coalesced => "coalesced",
        }
    }
}

/// File answering a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub status: CacheStatus,
}

pub struct Pipeline {
    storage: Arc<dyn StorageBackend>,
    cache: CacheStore,
    compositor: Arc<MarkerCompositor>,
    coalescer: Option<RequestCoalescer>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("storage", &self.storage.name())
            .field("cache", &self.cache)
            .field("coalescing", &self.coalescer.is_some())
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        cache: CacheStore,
        compositor: Arc<MarkerCompositor>,
    ) -> Self {
        Self {
            storage,
            cache,
            compositor,
            coalescer: None,
        }
    }

    /// Deduplicate concurrent renders of the same cache key
    pub fn with_coalescing(mut self, coalescer: RequestCoalescer) -> Self {
        self.coalescer = Some(coalescer);
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Resolve `request` into the path of a file holding the answer.
    ///
    /// Cached artifacts are returned as-is; they are never re-validated
    /// against the original.
    pub async fn produce(&self, request: &TransformRequest) -> Result<Artifact, PipelineError> {
        let metrics = Metrics::global();

        if !self.storage.stores_original() && request.is_passthrough() {
            if let Some(path) = self.storage.original_path(request.source_path()).await? {
                metrics.record_short_circuit();
                return Ok(Artifact {
                    path,
                    status: CacheStatus::Bypass,
                });
            }
        }

        let key = self.cache.key(request);
        if let Some(path) = self.cache.lookup_key(&key).await? {
            metrics.record_cache_hit();
            return Ok(Artifact {
                path,
                status: CacheStatus::Hit,
            });
        }

        // Held until the artifact is stored so followers find it on wake-up
        let _leader = match &self.coalescer {
            Some(coalescer) => match coalescer.acquire(&key).await {
                CoalescingSlot::Leader(guard) => {
                    // A previous leader may have stored it since our lookup
                    if let Some(path) = self.cache.lookup_key(&key).await? {
                        metrics.record_cache_hit();
                        return Ok(Artifact {
                            path,
                            status: CacheStatus::Hit,
                        });
                    }
                    Some(guard)
                }
                CoalescingSlot::Follower => {
                    metrics.record_coalesced_follower();
                    if let Some(path) = self.cache.lookup_key(&key).await? {
                        return Ok(Artifact {
                            path,
                            status: CacheStatus::Coalesced,
                        });
                    }
                    // Leader failed; render without coalescing
                    None
                }
            },
            None => None,
        };

        metrics.record_cache_miss();
        let path = self.render_and_store(request, &key).await?;
        Ok(Artifact {
            path,
            status: CacheStatus::Miss,
        })
    }

    async fn render_and_store(
        &self,
        request: &TransformRequest,
        key: &CacheKey,
    ) -> Result<PathBuf, PipelineError> {
        let source = self.storage.fetch(request.source_path()).await?;

        let compositor = Arc::clone(&self.compositor);
        let owned_request = request.clone();
        let started = Instant::now();
        let (encoded, format) = tokio::task::spawn_blocking(move || {
            render_artifact(&source, &owned_request, &compositor)
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("transform task failed: {}", e)))??;

        let elapsed = started.elapsed();
        Metrics::global().record_transform(format.extension(), elapsed);
        tracing::debug!(
            path = %request.source_path(),
            key = %key,
            bytes = encoded.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Rendered artifact"
        );

        let outcome = self.cache.store_key(key, Bytes::from(encoded)).await?;
        Metrics::global().record_store(matches!(outcome, StoreOutcome::Written(_)));
        Ok(outcome.into_path())
    }
}

/// Render `request` from the original bytes into encoded output.
///
/// Markers are drawn before encoding, and only when no crop was applied.
pub fn render_artifact(
    source: &[u8],
    request: &TransformRequest,
    compositor: &MarkerCompositor,
) -> Result<(Vec<u8>, OutputFormat), PipelineError> {
    let rendered = render(source, request)?;
    let format = rendered.format;

    let image = if !rendered.crop_applied && !request.markers().is_empty() {
        compositor.composite(rendered.image, request.markers(), request.mode())
    } else {
        rendered.image
    };

    Ok((encode(&image, format)?, format))
}
