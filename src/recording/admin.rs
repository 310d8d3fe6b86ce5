//! Mock server admin API client.
//!
//! Two calls per recorded exchange, always in this order:
//! - `PUT  {admin}/__admin/files/{token}`  stores the response body
//! - `POST {admin}/__admin/mappings`       creates the stub referencing it

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use uuid::Uuid;

use crate::config::MockServerConfig;
use crate::recording::mapping::StubMapping;

/// Errors talking to the mock server admin API.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Connection, timeout or protocol failure.
    #[error("admin request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The admin API answered with a non-success status.
    #[error("admin request to {endpoint} returned {status}")]
    Status { endpoint: String, status: StatusCode },
}

/// Operations the recorder needs from a mock server.
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Store `body` as a file named after `token`.
    async fn store_body_file(&self, token: Uuid, body: Bytes) -> Result<(), AdminError>;

    /// Create a stub mapping.
    async fn create_mapping(&self, mapping: &StubMapping) -> Result<(), AdminError>;
}

/// `AdminApi` over HTTP.
#[derive(Debug, Clone)]
pub struct AdminClient {
    client: Client,
    base_url: String,
}

impl AdminClient {
    pub fn new(config: &MockServerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            base_url: config.admin_url.trim_end_matches('/').to_string(),
        })
    }

    fn files_url(&self, token: Uuid) -> String {
        format!("{}/__admin/files/{}", self.base_url, token)
    }

    fn mappings_url(&self) -> String {
        format!("{}/__admin/mappings", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, endpoint: String) -> Result<(), AdminError> {
        let response = request.send().await.map_err(|source| AdminError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdminError::Status { endpoint, status });
        }
        Ok(())
    }
}

#[async_trait]
impl AdminApi for AdminClient {
    async fn store_body_file(&self, token: Uuid, body: Bytes) -> Result<(), AdminError> {
        let url = self.files_url(token);
        let request = self
            .client
            .put(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
        self.send(request, url).await
    }

    async fn create_mapping(&self, mapping: &StubMapping) -> Result<(), AdminError> {
        let url = self.mappings_url();
        let request = self.client.post(&url).json(mapping);
        self.send(request, url).await
    }
}
