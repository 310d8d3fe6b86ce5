//! Non-destructive body capture.
//!
//! # Responsibilities
//! - Drain a request or response body into memory
//! - Put an identical, once-readable body back on the message
//! - Keep `content-length` consistent with the captured bytes
//!
//! # Design Decisions
//! - Capture never alters what the message delivers: when it gives up, the
//!   bytes already read are replayed ahead of the unread stream
//! - A stream error mid-body is replayed too, so the peer sees a broken body
//! - `transfer-encoding` is dropped only once the full length is known

use axum::body::{Body, BodyDataStream, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Request, Response};
use futures_util::{stream, StreamExt};
use thiserror::Error;

/// Why a body was not captured. The message body is intact either way.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("body exceeds capture limit of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("body stream failed after {read} bytes: {reason}")]
    Interrupted { read: usize, reason: String },
}

/// An HTTP message whose body can be swapped out.
pub trait HttpMessage {
    fn body_mut(&mut self) -> &mut Body;
    fn headers_mut(&mut self) -> &mut HeaderMap;
}

impl HttpMessage for Request<Body> {
    fn body_mut(&mut self) -> &mut Body {
        Request::body_mut(self)
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        Request::headers_mut(self)
    }
}

impl HttpMessage for Response<Body> {
    fn body_mut(&mut self) -> &mut Body {
        Response::body_mut(self)
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        Response::headers_mut(self)
    }
}

/// Read the whole body of `message` (at most `limit` bytes) and restore it.
///
/// On success the message can be read exactly once more and yields the same
/// bytes. On failure the message still yields exactly what the original body
/// would have, with its headers untouched.
pub async fn capture<M: HttpMessage>(message: &mut M, limit: usize) -> Result<Bytes, CaptureError> {
    let mut frames = std::mem::take(message.body_mut()).into_data_stream();
    let mut read: Vec<Bytes> = Vec::new();
    let mut len = 0usize;

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(chunk) if len + chunk.len() > limit => {
                read.push(chunk);
                *message.body_mut() = replay(read, frames);
                return Err(CaptureError::TooLarge { limit });
            }
            Ok(chunk) => {
                len += chunk.len();
                read.push(chunk);
            }
            Err(e) => {
                let reason = e.to_string();
                let prefix = read.into_iter().map(Ok).chain(std::iter::once(Err(e)));
                *message.body_mut() = Body::from_stream(stream::iter(prefix.collect::<Vec<_>>()));
                return Err(CaptureError::Interrupted { read: len, reason });
            }
        }
    }

    let bytes = concat(read, len);
    *message.body_mut() = Body::from(bytes.clone());
    set_length(message.headers_mut(), bytes.len());
    Ok(bytes)
}

/// True when `content-length` announces more than `limit` bytes.
///
/// Such bodies are left streaming and their exchange is not recorded.
pub fn exceeds_limit(headers: &HeaderMap, limit: usize) -> bool {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|len| len > limit as u64)
}

fn replay(read: Vec<Bytes>, rest: BodyDataStream) -> Body {
    Body::from_stream(stream::iter(read.into_iter().map(Ok)).chain(rest))
}

fn concat(mut chunks: Vec<Bytes>, len: usize) -> Bytes {
    if chunks.len() == 1 {
        return chunks.pop().unwrap_or_default();
    }
    let mut buf = Vec::with_capacity(len);
    for chunk in &chunks {
        buf.extend_from_slice(chunk);
    }
    Bytes::from(buf)
}

fn set_length(headers: &mut HeaderMap, len: usize) {
    headers.remove(header::TRANSFER_ENCODING);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
}
