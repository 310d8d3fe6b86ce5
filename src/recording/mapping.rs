//! Stub mapping documents and the builder that derives them from an exchange.
//!
//! The serialized form is the WireMock admin API mapping format:
//!
//! ```json
//! {
//!   "id": "<token>",
//!   "persistent": true,
//!   "request": { "method": "POST", "url": "/orders", "bodyPatterns": [ ... ] },
//!   "response": { "headers": { ... }, "bodyFileName": "<token>", "status": 201 },
//!   "uuid": "<token>"
//! }
//! ```

use std::collections::BTreeMap;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recording::sanitizer::{ParseError, Sanitizer};
use crate::recording::types::{CapturedRequest, CapturedResponse};

/// A persisted stub: how to match a request and what to answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StubMapping {
    pub id: Uuid,
    pub persistent: bool,
    pub request: RequestPattern,
    pub response: ResponseDefinition,
    pub uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPattern {
    pub method: String,
    /// Exact match on path and query.
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_patterns: Vec<BodyPattern>,
}

/// An `equalToJson` body matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPattern {
    pub equal_to_json: String,
    pub ignore_array_order: bool,
    pub ignore_extra_elements: bool,
}

impl BodyPattern {
    /// Superset match tolerant of reordering and extra upstream fields.
    pub fn lenient(json: String) -> Self {
        Self {
            equal_to_json: json,
            ignore_array_order: true,
            ignore_extra_elements: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDefinition {
    pub headers: BTreeMap<String, Vec<String>>,
    pub body_file_name: String,
    pub status: u16,
}

/// Builds stub mappings, sanitizing request bodies on the way.
#[derive(Debug, Clone)]
pub struct MappingBuilder {
    sanitizer: Sanitizer,
}

impl MappingBuilder {
    pub fn new(sanitizer: Sanitizer) -> Self {
        Self { sanitizer }
    }

    /// Build the mapping for one exchange under `token`.
    ///
    /// Fails only when a body pattern is required and the request body is not
    /// JSON; an unsanitized pattern is never produced.
    pub fn build(
        &self,
        request: &CapturedRequest,
        response: &CapturedResponse,
        token: Uuid,
    ) -> Result<StubMapping, ParseError> {
        let mut body_patterns = Vec::new();
        if carries_body(&request.method) && !request.body.is_empty() {
            let sanitized = self.sanitizer.sanitize(&request.body)?;
            let json = String::from_utf8_lossy(&sanitized).into_owned();
            body_patterns.push(BodyPattern::lenient(json));
        }

        Ok(StubMapping {
            id: token,
            persistent: true,
            request: RequestPattern {
                method: request.method.to_string(),
                url: request.url.clone(),
                body_patterns,
            },
            response: ResponseDefinition {
                headers: response.headers.clone(),
                body_file_name: token.to_string(),
                status: response.status,
            },
            uuid: token,
        })
    }
}

/// Methods whose body is part of what the request means.
fn carries_body(method: &Method) -> bool {
    !(method.is_safe() || method == Method::DELETE)
}
