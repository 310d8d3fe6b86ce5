//! The recording interception point around the outbound proxy call.
//!
//! # Responsibilities
//! - Perform the real upstream round trip
//! - On a response, capture its body and hand the exchange to the recorder
//! - Return the response, body intact, whatever the recording outcome
//!
//! # Design Decisions
//! - No response means nothing to record; upstream errors skip recording
//! - Recording is a side effect: detached by default, inline on request

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, Response};

use crate::http::body;
use crate::http::upstream::{UpstreamClient, UpstreamError};
use crate::observability::metrics;
use crate::recording::queue::RecordingQueue;
use crate::recording::recorder::Recorder;
use crate::recording::types::{CapturedRequest, CapturedResponse, Exchange};
use crate::recording::RecordingError;

/// Where captured exchanges go.
#[derive(Clone)]
pub enum Dispatch {
    /// Pass-through proxy; nothing is recorded.
    Disabled,
    /// Record on the response path before returning.
    Inline(Arc<Recorder>),
    /// Hand off to the background worker.
    Detached(RecordingQueue),
}

impl Dispatch {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Dispatch::Disabled)
    }

    async fn dispatch(&self, exchange: Exchange) {
        match self {
            Dispatch::Disabled => {}
            Dispatch::Inline(recorder) => recorder.record_and_log(exchange).await,
            Dispatch::Detached(queue) => {
                queue.submit(exchange);
            }
        }
    }
}

/// Upstream client wrapped with stub recording.
#[derive(Clone)]
pub struct RecordingTransport {
    upstream: UpstreamClient,
    dispatch: Dispatch,
    max_body_bytes: usize,
}

impl RecordingTransport {
    pub fn new(upstream: UpstreamClient, dispatch: Dispatch, max_body_bytes: usize) -> Self {
        Self {
            upstream,
            dispatch,
            max_body_bytes,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.dispatch.is_enabled()
    }

    /// Largest body buffered for recording, in either direction.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Forward `request` and record the exchange when `captured` is present.
    pub async fn round_trip(
        &self,
        request: Request<Body>,
        captured: Option<CapturedRequest>,
        request_id: &str,
        peer: Option<SocketAddr>,
    ) -> Result<Response<Body>, UpstreamError> {
        let mut response = self.upstream.send(request, peer).await?;

        let Some(captured) = captured.filter(|_| self.is_recording()) else {
            return Ok(response);
        };
        // A HEAD response has no body to capture and keeps its declared length.
        let bytes = if captured.method == Method::HEAD {
            Bytes::new()
        } else if body::exceeds_limit(response.headers(), self.max_body_bytes) {
            metrics::record_recording("too_large");
            tracing::warn!(
                request_id = %request_id,
                url = %captured.url,
                "Response body over capture limit, exchange not recorded"
            );
            return Ok(response);
        } else {
            match body::capture(&mut response, self.max_body_bytes).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    let e = RecordingError::from(e);
                    metrics::record_recording(e.kind());
                    tracing::warn!(
                        request_id = %request_id,
                        url = %captured.url,
                        error = %e,
                        "Response body not captured, exchange not recorded"
                    );
                    return Ok(response);
                }
            }
        };

        let exchange = Exchange {
            request_id: request_id.to_string(),
            request: captured,
            response: CapturedResponse::new(response.status(), response.headers(), bytes),
        };
        self.dispatch.dispatch(exchange).await;

        Ok(response)
    }
}
