// Server module - Pingora ProxyHttp implementation
// Every request is answered locally in request_filter; there is no upstream.

pub mod response;
pub mod routes;

pub use response::{EndpointResponse, NOT_FOUND_MESSAGE};
pub use routes::{match_route, Route};

use async_trait::async_trait;
use bytes::Bytes;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::error::PipelineError;
use crate::metrics::Metrics;
use crate::pipeline::{Pipeline, RequestContext};
use crate::request::{parse_query_string, TransformRequest};
use crate::transform::content_type_for_path;

/// Image server answering transform, health and metrics requests
pub struct ImageServer {
    pipeline: Arc<Pipeline>,
    route_root: String,
    request_semaphore: Arc<Semaphore>,
    /// Server start time (for uptime in /health)
    start_time: Instant,
}

impl ImageServer {
    pub fn new(config: &ServerConfig, pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            route_root: config.normalized_route_root(),
            request_semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            start_time: Instant::now(),
        }
    }

    /// Produce the response for one request.
    ///
    /// `path` is the raw URI path and `query` the raw query string.
    pub async fn handle(
        &self,
        method: &str,
        path: &str,
        query: Option<&str>,
        ctx: &mut RequestContext,
    ) -> EndpointResponse {
        ctx.set_path(path);

        // Held until the response is built
        let _permit = match self.request_semaphore.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    "Rejecting request due to max concurrent requests reached"
                );
                return EndpointResponse::overloaded();
            }
        };

        match match_route(&self.route_root, method, path) {
            Route::Health => self.handle_health(),
            Route::Metrics => handle_metrics(),
            Route::Transform {
                width,
                height,
                image_path,
            } => {
                self.handle_transform(&image_path, &width, &height, query, ctx)
                    .await
            }
            Route::NotFound => EndpointResponse::not_found(),
        }
    }

    fn handle_health(&self) -> EndpointResponse {
        let body = serde_json::json!({
            "status": "healthy",
            "uptime_seconds": self.start_time.elapsed().as_secs(),
            "version": env!("CARGO_PKG_VERSION"),
        })
        .to_string();
        EndpointResponse::json(200, body)
    }

    async fn handle_transform(
        &self,
        image_path: &str,
        width: &str,
        height: &str,
        query: Option<&str>,
        ctx: &mut RequestContext,
    ) -> EndpointResponse {
        let params = parse_query_string(query.unwrap_or_default());
        let request = match TransformRequest::from_route(image_path, width, height, &params) {
            Ok(request) => request,
            Err(err) => {
                ctx.set_error(err.to_string());
                return EndpointResponse::from_pipeline_error(&err);
            }
        };

        let artifact = match self.pipeline.produce(&request).await {
            Ok(artifact) => artifact,
            Err(err) => {
                ctx.set_error(err.to_string());
                return EndpointResponse::from_pipeline_error(&err);
            }
        };
        ctx.set_cache_status(artifact.status);

        match tokio::fs::read(&artifact.path).await {
            Ok(data) => EndpointResponse::file(
                content_type_for_path(request.source_path()),
                Bytes::from(data),
            ),
            Err(e) => {
                // Evicted between produce and read
                ctx.set_error(format!("{}: {}", artifact.path.display(), e));
                let err = PipelineError::from(e);
                EndpointResponse::from_pipeline_error(&err)
            }
        }
    }
}

fn handle_metrics() -> EndpointResponse {
    match Metrics::global().render() {
        Ok(body) => EndpointResponse::prometheus(body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            EndpointResponse::error(500, "Internal server error")
        }
    }
}

async fn write_response(session: &mut Session, response: EndpointResponse) -> Result<()> {
    let mut header = ResponseHeader::build(response.status, None)?;
    header.insert_header("Content-Type", response.content_type)?;
    header.insert_header("Content-Length", response.body.len().to_string())?;
    for (name, value) in response.headers {
        header.insert_header(name, value)?;
    }

    session
        .write_response_header(Box::new(header), false)
        .await?;
    session.write_response_body(Some(response.body), true).await?;
    Ok(())
}

#[async_trait]
impl ProxyHttp for ImageServer {
    type CTX = RequestContext;

    /// Create a new request context for each incoming request
    fn new_ctx(&self) -> Self::CTX {
        RequestContext::new()
    }

    /// Never reached: request_filter answers every request
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Err(pingora_core::Error::explain(
            pingora_core::ErrorType::InternalError,
            "requests are answered locally",
        ))
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let req = session.req_header();
        let method = req.method.as_str().to_string();
        let path = req.uri.path().to_string();
        let query = req.uri.query().map(|q| q.to_string());

        let response = self.handle(&method, &path, query.as_deref(), ctx).await;
        write_response(session, response).await?;
        Ok(true)
    }

    /// One log line and one metrics sample per request
    async fn logging(
        &self,
        session: &mut Session,
        _e: Option<&pingora_core::Error>,
        ctx: &mut Self::CTX,
    ) {
        let status = session
            .response_written()
            .map(|resp| resp.status.as_u16())
            .unwrap_or(500);
        Metrics::global().record_request(status);

        let cache = ctx.cache_status().map(|s| s.as_str()).unwrap_or("none");
        let elapsed_ms = ctx.elapsed().as_secs_f64() * 1000.0;

        if status >= 500 {
            tracing::error!(
                request_id = %ctx.request_id(),
                path = %ctx.path(),
                status = status,
                cache = cache,
                elapsed_ms = elapsed_ms,
                error = ctx.error().unwrap_or_default(),
                "Request failed"
            );
        } else if let Some(error) = ctx.error() {
            tracing::warn!(
                request_id = %ctx.request_id(),
                path = %ctx.path(),
                status = status,
                cache = cache,
                elapsed_ms = elapsed_ms,
                error = error,
                "Request rejected"
            );
        } else {
            tracing::info!(
                request_id = %ctx.request_id(),
                path = %ctx.path(),
                status = status,
                cache = cache,
                elapsed_ms = elapsed_ms,
                "Request completed"
            );
        }
    }
}
