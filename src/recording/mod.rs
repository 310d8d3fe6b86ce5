//! Stub recording subsystem.
//!
//! # Data Flow
//! ```text
//! captured request ─┐
//!                   ├─▶ transport.rs (upstream round trip, response capture)
//! upstream response ┘        │
//!                            ▼
//!                   queue.rs (detached) or inline
//!                            │
//!                            ▼
//!                   recorder.rs
//!                     → sanitizer.rs (request body, volatile fields removed)
//!                     → mapping.rs   (StubMapping under a fresh token)
//!                     → admin.rs     (store body file, then create mapping)
//! ```
//!
//! # Design Decisions
//! - Every failure stays inside its own exchange; the client never sees it
//! - One token per exchange: stub id, uuid and body file name
//! - No retries, no deduplication

pub mod admin;
pub mod mapping;
pub mod queue;
pub mod recorder;
pub mod sanitizer;
pub mod transport;
pub mod types;

use thiserror::Error;

use crate::http::body::CaptureError;

pub use admin::{AdminApi, AdminClient, AdminError};
pub use mapping::{BodyPattern, MappingBuilder, RequestPattern, ResponseDefinition, StubMapping};
pub use queue::RecordingQueue;
pub use recorder::Recorder;
pub use sanitizer::{ParseError, Sanitizer};
pub use transport::{Dispatch, RecordingTransport};
pub use types::{CapturedRequest, CapturedResponse, Exchange};

/// Why an exchange was not recorded.
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Admin(#[from] AdminError),
}

impl RecordingError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordingError::Capture(CaptureError::TooLarge { .. }) => "too_large",
            RecordingError::Capture(_) => "capture_error",
            RecordingError::Parse(_) => "parse_error",
            RecordingError::Admin(_) => "admin_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_capture_is_labelled_too_large() {
        let too_large = RecordingError::from(CaptureError::TooLarge { limit: 16 });
        let interrupted = RecordingError::from(CaptureError::Interrupted {
            read: 3,
            reason: "reset".to_string(),
        });

        assert_eq!(too_large.kind(), "too_large");
        assert_eq!(interrupted.kind(), "capture_error");
    }
}
