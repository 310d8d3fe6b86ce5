//! Request identification and capture.
//!
//! # Responsibilities
//! - Assign every inbound request an `x-request-id` (UUID v4) unless it has one
//! - Echo the ID back on the response
//! - Snapshot method, URL and body before the request is forwarded

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::recording::CapturedRequest;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer that stamps missing request IDs.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer that copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// The request ID, or "unknown" if absent or not ASCII.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Snapshot of `request` with an already captured body.
pub fn captured_request(request: &Request<Body>, body: Bytes) -> CapturedRequest {
    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    CapturedRequest {
        method: request.method().clone(),
        url,
        body,
    }
}
