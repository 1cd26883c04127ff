//! Upload broker HTTP service implementing the hyper `Service` trait.
//!
//! Request pipeline:
//!
//! 1. Mount path matching
//! 2. Health check (`GET /health`, only outside the mount)
//! 3. Route resolution via [`resolve_route`]
//! 4. Preflight short-circuit (`OPTIONS`, bare 204)
//! 5. Body collection and parameter parsing
//! 6. Dispatch to [`MultipartHandler`]
//! 7. Common response headers (`x-request-id`, `content-type`)
//! 8. Error response formatting

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::body::Incoming;
use partsmith_core::BrokerConfig;
use tracing::{debug, warn};

use crate::body::UploadResponseBody;
use crate::error::ApiError;
use crate::handler::MultipartHandler;
use crate::request::UploadRequest;
use crate::response::{CONTENT_TYPE, error_to_response, no_content};
use crate::router::{Route, resolve_route};

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Configuration for the HTTP service.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Path prefix the upload routes live under (`""` or `"/"` for the root).
    pub mount_path: String,
}

impl ServiceConfig {
    /// Mount the routes under `mount_path`.
    pub fn new(mount_path: impl Into<String>) -> Self {
        Self {
            mount_path: mount_path.into(),
        }
    }

    /// Take the mount path from broker configuration.
    #[must_use]
    pub fn from_broker_config(config: &BrokerConfig) -> Self {
        Self::new(config.normalized_mount_path())
    }

    /// The part of `path` below the mount, or `None` if `path` is outside it.
    fn relative_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        let mount = self.mount_path.trim_end_matches('/');
        if mount.is_empty() {
            return Some(path);
        }
        let rest = path.strip_prefix(mount)?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }
}

/// Hyper `Service` for the multipart upload protocol.
#[derive(Debug)]
pub struct MultipartService {
    handler: Arc<MultipartHandler>,
    config: Arc<ServiceConfig>,
}

impl MultipartService {
    /// Create a new `MultipartService`.
    pub fn new(handler: MultipartHandler, config: ServiceConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            config: Arc::new(config),
        }
    }

    /// Serve one request with any body type.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<UploadResponseBody>
    where
        B: http_body::Body,
        B::Error: Display,
    {
        let request_id = uuid::Uuid::new_v4().to_string();
        match process_request(req, &self.handler, &self.config).await {
            Outcome::Bare(response) => response,
            Outcome::Full(response) => add_common_headers(response, &request_id),
        }
    }
}

impl Clone for MultipartService {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl hyper::service::Service<http::Request<Incoming>> for MultipartService {
    type Response = http::Response<UploadResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

/// A response that either gets the common headers or goes out as-is.
enum Outcome {
    Bare(http::Response<UploadResponseBody>),
    Full(http::Response<UploadResponseBody>),
}

/// Process a single request through the full pipeline.
async fn process_request<B>(
    req: http::Request<B>,
    handler: &MultipartHandler,
    config: &ServiceConfig,
) -> Outcome
where
    B: http_body::Body,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();

    // 1-2. Mount, then the health check for paths the mount does not claim.
    let Some(path) = config.relative_path(parts.uri.path()) else {
        if is_health_check(&parts.method, parts.uri.path()) {
            return Outcome::Full(health_check_response());
        }
        debug!(method = %parts.method, path = %parts.uri.path(), "path outside mount");
        return Outcome::Full(error_to_response(&ApiError::RouteNotFound));
    };

    // 3. Route.
    let route = match resolve_route(&parts.method, path) {
        Ok(route) => route,
        Err(err) => {
            debug!(method = %parts.method, path = %parts.uri.path(), "no route matched");
            return Outcome::Full(error_to_response(&err));
        }
    };

    // 4. Preflight.
    if route == Route::Preflight {
        return Outcome::Bare(no_content());
    }

    // 5. Collect and parse.
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let err = ApiError::Validation(format!("Failed to read request body: {e}"));
            return Outcome::Full(error_to_response(&err));
        }
    };
    let request = match UploadRequest::from_parts(&parts, &bytes) {
        Ok(request) => request,
        Err(err) => return Outcome::Full(error_to_response(&err)),
    };

    // 6. Dispatch.
    match handler.handle(&route, &request).await {
        Ok(response) => Outcome::Full(response),
        Err(err) => {
            match &err {
                ApiError::Storage(storage_err) => {
                    warn!(route = %route, error = %storage_err, "storage call failed");
                }
                ApiError::Internal(message) => {
                    warn!(route = %route, error = %message, "failed to build response");
                }
                _ => debug!(route = %route, error = %err, "request rejected"),
            }
            Outcome::Full(error_to_response(&err))
        }
    }
}

/// Check if the request is a health check.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && path == "/health"
}

/// Produce a health check response.
fn health_check_response() -> http::Response<UploadResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .body(UploadResponseBody::from_json(
            br#"{"status":"running","service":"partsmith"}"#.to_vec(),
        ))
        .expect("static health response should be valid")
}

/// Add common response headers.
fn add_common_headers(
    mut response: http::Response<UploadResponseBody>,
    request_id: &str,
) -> http::Response<UploadResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, hv);
    }

    headers
        .entry(http::header::CONTENT_TYPE)
        .or_insert(http::HeaderValue::from_static(CONTENT_TYPE));

    response
}
