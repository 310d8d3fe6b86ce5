//! Captured exchange types.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};

/// The inbound request as seen before it was forwarded.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    /// Path and query exactly as received.
    pub url: String,
    pub body: Bytes,
}

/// The upstream response as returned to the client.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: u16,
    /// Header name → values in arrival order.
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Bytes,
}

impl CapturedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            status: status.as_u16(),
            headers: header_multimap(headers),
            body,
        }
    }
}

/// One proxied request/response pair, ready to be recorded.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request_id: String,
    pub request: CapturedRequest,
    pub response: CapturedResponse,
}

fn header_multimap(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        map.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}
