//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{ProxyConfig, DEVELOPMENT};
use crate::config::validation::{validate_config, ValidationError};

/// Config file read from the working directory in development.
pub const DEVELOPMENT_CONFIG_FILE: &str = "config.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let config = read_file(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Resolve the full configuration.
///
/// Order: explicit file (or `./config.toml` in development), then
/// environment overrides from `env`, then validation.
pub fn resolve_config<F>(path: Option<&Path>, env: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let environment = env("ENVIRONMENT").filter(|e| !e.is_empty());

    let mut config = match path {
        Some(path) => read_file(path)?,
        None if environment.as_deref() == Some(DEVELOPMENT) => {
            let local = Path::new(DEVELOPMENT_CONFIG_FILE);
            if local.exists() {
                read_file(local)?
            } else {
                ProxyConfig::default()
            }
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, env);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay the variables the proxy has always been configured with.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| env(key).filter(|v| !v.is_empty());

    if let Some(environment) = get("ENVIRONMENT") {
        config.environment = environment;
    }
    if let Some(target) = get("API_TARGET") {
        config.upstream.target_url = target;
    }
    if let Some(admin) = get("API_WIREMOCK") {
        config.mock_server.admin_url = admin;
    }
    if let Some(proxy) = get("PROXY_URL") {
        config.upstream.proxy_url = Some(proxy);
    }
}

fn read_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}
