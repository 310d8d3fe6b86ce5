//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, request snapshot)
//!     → body.rs (capture request body, restore it)
//!     → recording transport → upstream.rs (forward to real API)
//!     → body.rs (capture response body, restore it)
//!     → Send to client (response.rs only when upstream failed)
//! ```

pub mod body;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError};
pub use upstream::{UpstreamClient, UpstreamError};
