//! Request correlation ids.
//!
//! Every request carries an `x-request-id`: the caller's if present, otherwise a
//! fresh UUID v4. The id is echoed on the response and recorded on the request's
//! tracing span, so log lines from handlers, the refresher and the hub can be
//! joined back to the HTTP call that caused them.

use axum::http::{header::HeaderValue, HeaderName, Request};
use std::sync::Arc;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tracing::Span;
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone, Debug)]
pub struct CorrelationId(pub Arc<str>);

impl CorrelationId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    /// Reads the id set by [`SetRequestIdLayer`], if any.
    #[must_use]
    pub fn from_request<B>(request: &Request<B>) -> Option<Self> {
        request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .map(|id| Self(Arc::from(id)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Default)]
pub struct UuidRequestIdGenerator;

impl MakeRequestId for UuidRequestIdGenerator {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = CorrelationId::generate();
        Some(RequestId::new(HeaderValue::from_str(id.as_str()).ok()?))
    }
}

/// Layers that set and echo `x-request-id`. Apply `propagate` before `set` so that
/// `set` runs first on the way in.
#[must_use]
pub fn create_request_id_layers() -> (SetRequestIdLayer<UuidRequestIdGenerator>, PropagateRequestIdLayer)
{
    (
        SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestIdGenerator),
        PropagateRequestIdLayer::new(X_REQUEST_ID.clone()),
    )
}

/// Span factory for `TraceLayer::make_span_with`.
pub fn request_span<B>(request: &Request<B>) -> Span {
    let request_id = CorrelationId::from_request(request)
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}
