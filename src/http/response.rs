//! Responses generated by the proxy itself.
//!
//! Upstream responses pass through untouched; only a missing upstream
//! response produces a proxy-made one.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::upstream::UpstreamError;

/// Map an upstream failure to a client-facing response.
pub fn upstream_failure(error: &UpstreamError) -> Response {
    let status = match error {
        UpstreamError::Client(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, "Upstream request failed").into_response()
}
