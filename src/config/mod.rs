//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (ENVIRONMENT, API_TARGET, API_WIREMOCK, PROXY_URL)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → passed by reference into every component constructor
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The environment lookup is injected, never read from inside components

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use schema::{
    ListenerConfig, LogFormat, MockServerConfig, ObservabilityConfig, ProxyConfig,
    RecordingConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::ValidationError;
