//! Per-request context: trace and request ids.

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Ids attached to every request as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Caller-supplied `X-Trace-ID`, or a fresh one
    pub trace_id: String,
    /// Always generated here
    pub request_id: String,
}

impl RequestContext {
    pub fn from_request(req: &Request<Body>) -> Self {
        let trace_id = req
            .headers()
            .get(&TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            trace_id,
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

pub async fn request_context_middleware(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::from_request(&request);
    let span = tracing::info_span!(
        "request",
        trace_id = %ctx.trace_id,
        request_id = %ctx.request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).instrument(span).await;

    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&ctx.trace_id) {
        headers.insert(TRACE_ID_HEADER, v);
    }
    if let Ok(v) = HeaderValue::from_str(&ctx.request_id) {
        headers.insert(REQUEST_ID_HEADER, v);
    }
    response
}
