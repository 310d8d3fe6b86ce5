//! Volatile field removal for JSON bodies.
//!
//! Request bodies often carry values that change on every call (modification
//! timestamps and the like). Left in an `equalToJson` pattern they would stop
//! the stub from ever matching again, so they are stripped before recording.

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

/// The body was not a JSON document.
#[derive(Debug, Error)]
#[error("body is not valid JSON: {0}")]
pub struct ParseError(#[from] serde_json::Error);

/// Strips a fixed set of keys from JSON documents at every depth.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    fields: HashSet<String>,
}

impl Sanitizer {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Sanitize raw JSON bytes. Empty input is returned as-is without parsing.
    pub fn sanitize(&self, body: &[u8]) -> Result<Vec<u8>, ParseError> {
        if body.is_empty() {
            return Ok(Vec::new());
        }
        let value: Value = serde_json::from_slice(body)?;
        Ok(serde_json::to_vec(&self.sanitize_value(value))?)
    }

    /// Sanitize an already parsed document.
    pub fn sanitize_value(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.sanitize_object(map)),
            Value::Array(items) => Value::Array(self.sanitize_array(items)),
            scalar => scalar,
        }
    }

    fn sanitize_object(&self, map: Map<String, Value>) -> Map<String, Value> {
        map.into_iter()
            .filter(|(key, _)| !self.fields.contains(key))
            .map(|(key, value)| {
                let value = match value {
                    Value::Object(inner) => Value::Object(self.sanitize_object(inner)),
                    Value::Array(items) => Value::Array(self.sanitize_array(items)),
                    other => other,
                };
                (key, value)
            })
            .collect()
    }

    // Only object elements are descended into; nested arrays pass through.
    fn sanitize_array(&self, items: Vec<Value>) -> Vec<Value> {
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(inner) => Value::Object(self.sanitize_object(inner)),
                other => other,
            })
            .collect()
    }
}
