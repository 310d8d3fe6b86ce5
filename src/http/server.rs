//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router serving every path on one listener
//! - Wire up middleware (request ID, tracing, timeout)
//! - Capture inbound request bodies for recording
//! - Forward requests upstream through the recording transport
//! - Start and drain the recording worker around the server's lifetime

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::request::{
    captured_request, propagate_request_id_layer, request_id, set_request_id_layer,
};
use crate::http::upstream::{UpstreamClient, UpstreamError};
use crate::http::{body, response};
use crate::observability::metrics;
use crate::recording::{
    AdminApi, AdminClient, Dispatch, MappingBuilder, Recorder, RecordingError, RecordingQueue,
    RecordingTransport, Sanitizer,
};

/// Startup failures building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("upstream client: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("admin client: {0}")]
    Admin(#[from] reqwest::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub transport: RecordingTransport,
}

/// HTTP server for the recording proxy.
pub struct HttpServer {
    config: ProxyConfig,
    upstream: UpstreamClient,
    admin: Arc<dyn AdminApi>,
}

impl HttpServer {
    /// Create a new HTTP server talking to the configured mock server.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let admin = Arc::new(AdminClient::new(&config.mock_server)?);
        Self::with_admin(config, admin)
    }

    /// Create a server with a custom admin API implementation.
    pub fn with_admin(config: ProxyConfig, admin: Arc<dyn AdminApi>) -> Result<Self, ServerError> {
        let upstream = UpstreamClient::new(&config.upstream, &config.timeouts)?;
        Ok(Self {
            config,
            upstream,
            admin,
        })
    }

    /// Run the server until `shutdown` fires, then drain pending recordings.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let (dispatch, worker) = self.dispatch();

        tracing::info!(
            address = %addr,
            target = %self.upstream.target(),
            admin = %self.config.mock_server.admin_url,
            recording = self.config.recording.enabled,
            detached = self.config.recording.detached,
            "HTTP server starting"
        );

        let state = AppState {
            transport: RecordingTransport::new(
                self.upstream.clone(),
                dispatch,
                self.config.listener.max_body_bytes,
            ),
        };
        let app = Self::build_router(&self.config, state)
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        // The router and every queue handle are gone now.
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Recording worker failed");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn dispatch(&self) -> (Dispatch, Option<JoinHandle<()>>) {
        let recording = &self.config.recording;
        if !recording.enabled {
            return (Dispatch::Disabled, None);
        }

        let sanitizer = Sanitizer::new(recording.volatile_fields.iter().cloned());
        let recorder = Arc::new(Recorder::new(MappingBuilder::new(sanitizer), self.admin.clone()));

        if recording.detached {
            let (queue, worker) = RecordingQueue::spawn(recorder, recording.queue_capacity);
            (Dispatch::Detached(queue), Some(worker))
        } else {
            (Dispatch::Inline(recorder), None)
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The overall deadline covers the upstream call plus both admin calls,
    /// which run on the response path in inline mode.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let deadline = Duration::from_secs(
            config.timeouts.request_secs + 2 * config.mock_server.timeout_secs,
        );

        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(deadline)),
            )
    }
}

/// Main proxy handler.
/// Captures the request, forwards it, and returns the upstream response.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %request.uri(),
        "Proxying request"
    );

    let limit = state.transport.max_body_bytes();
    let captured = if !state.transport.is_recording() {
        None
    } else if body::exceeds_limit(request.headers(), limit) {
        metrics::record_recording("too_large");
        tracing::warn!(
            request_id = %request_id,
            "Request body over capture limit, exchange not recorded"
        );
        None
    } else {
        match body::capture(&mut request, limit).await {
            Ok(bytes) => Some(captured_request(&request, bytes)),
            Err(e) => {
                let e = RecordingError::from(e);
                metrics::record_recording(e.kind());
                tracing::warn!(
                    request_id = %request_id,
                    error = %e,
                    "Request body not captured, exchange not recorded"
                );
                None
            }
        }
    };

    match state
        .transport
        .round_trip(request, captured, &request_id, Some(peer))
        .await
    {
        Ok(response) => {
            metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
            response
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            let response = response::upstream_failure(&e);
            metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
            response
        }
    }
}
