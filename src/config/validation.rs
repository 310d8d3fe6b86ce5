//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every URL is an absolute http(s) URL
//! - Validate value ranges (limits > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL {value:?}: {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("listener.bind_address: invalid socket address {0:?}")]
    InvalidBindAddress(String),

    #[error("recording.volatile_fields: field names must not be empty")]
    EmptyVolatileField,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a fully resolved configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url("upstream.target_url", &config.upstream.target_url, &mut errors);
    check_url("mock_server.admin_url", &config.mock_server.admin_url, &mut errors);
    if let Some(proxy_url) = &config.upstream.proxy_url {
        check_url("upstream.proxy_url", proxy_url, &mut errors);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config
        .recording
        .volatile_fields
        .iter()
        .any(|f| f.trim().is_empty())
    {
        errors.push(ValidationError::EmptyVolatileField);
    }

    if config.recording.queue_capacity == 0 {
        errors.push(ValidationError::Zero("recording.queue_capacity"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("listener.max_body_bytes"));
    }
    if config.mock_server.timeout_secs == 0 {
        errors.push(ValidationError::Zero("mock_server.timeout_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    let reason = match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => return,
        Ok(url) => format!("unsupported scheme {:?}", url.scheme()),
        Err(e) => e.to_string(),
    };
    errors.push(ValidationError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    });
}
