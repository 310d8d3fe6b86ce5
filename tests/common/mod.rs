//! Shared doubles for integration testing: a fake upstream API and a fake
//! mock-server admin API, both on ephemeral ports.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use futures_util::stream;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use stub_recorder::{HttpServer, ProxyConfig, Shutdown};

/// A stored body file as received by the admin double.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Records every admin API call it receives.
#[derive(Debug, Default)]
pub struct AdminDouble {
    pub fail_files: AtomicBool,
    pub file_calls: AtomicUsize,
    pub mapping_calls: AtomicUsize,
    pub files: Mutex<Vec<StoredFile>>,
    pub mappings: Mutex<Vec<Value>>,
}

impl AdminDouble {
    pub fn files(&self) -> Vec<StoredFile> {
        self.files.lock().unwrap().clone()
    }

    pub fn mappings(&self) -> Vec<Value> {
        self.mappings.lock().unwrap().clone()
    }
}

async fn store_file(
    State(admin): State<Arc<AdminDouble>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    admin.file_calls.fetch_add(1, Ordering::SeqCst);
    if admin.fail_files.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    admin.files.lock().unwrap().push(StoredFile {
        name,
        content_type: headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    StatusCode::OK
}

async fn create_mapping(State(admin): State<Arc<AdminDouble>>, Json(mapping): Json<Value>) -> StatusCode {
    admin.mapping_calls.fetch_add(1, Ordering::SeqCst);
    admin.mappings.lock().unwrap().push(mapping);
    StatusCode::CREATED
}

/// Start a fake mock-server admin API.
pub async fn start_admin(fail_files: bool) -> (SocketAddr, Arc<AdminDouble>) {
    let admin = Arc::new(AdminDouble::default());
    admin.fail_files.store(fail_files, Ordering::SeqCst);

    let app = Router::new()
        .route("/__admin/files/{name}", put(store_file))
        .route("/__admin/mappings", post(create_mapping))
        .with_state(admin.clone());

    (serve(app).await, admin)
}

/// Frames of the chunked `GET /stream` response body.
pub const STREAMED_PARTS: [&str; 3] = ["first-chunk-0123", "second-chunk-456", "third-chunk-7890"];

/// Split `parts` into a chunked body stream without a declared length.
pub fn chunks(parts: &[&'static str]) -> impl futures_util::Stream<Item = Result<Bytes, std::io::Error>> {
    let frames: Vec<Result<Bytes, std::io::Error>> = parts
        .iter()
        .copied()
        .map(|p| Ok(Bytes::from_static(p.as_bytes())))
        .collect();
    stream::iter(frames)
}

/// Start a fake upstream API.
///
/// - `POST /orders` → 201 `{"status":"ok"}`
/// - `GET /orders/{id}` → 200 `{"id":<id>}`
/// - `GET /stream` → 200 chunked body made of `STREAMED_PARTS`
/// - anything else → 200 echoing the request body, `x-forwarded-for` in `x-seen-forwarded-for`
pub async fn start_upstream() -> SocketAddr {
    let app = Router::new()
        .route(
            "/orders",
            post(|| async { (StatusCode::CREATED, Json(json!({"status": "ok"}))) }),
        )
        .route(
            "/orders/{id}",
            get(|Path(id): Path<u64>| async move { Json(json!({"id": id})) }),
        )
        .route(
            "/stream",
            get(|| async { Body::from_stream(chunks(&STREAMED_PARTS)) }),
        )
        .fallback(|headers: HeaderMap, body: Bytes| async move {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            ([("x-seen-forwarded-for", forwarded)], body)
        });

    serve(app).await
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Inline-recording config pointing at the given doubles.
pub fn proxy_config(upstream: SocketAddr, admin: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.target_url = format!("http://{upstream}");
    config.mock_server.admin_url = format!("http://{admin}");
    config.mock_server.timeout_secs = 2;
    config.recording.detached = false;
    config
}

/// A running proxy under test.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger graceful shutdown and wait for the server to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("proxy did not shut down")
            .unwrap()
            .unwrap();
    }
}

pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, rx).await });

    RunningProxy {
        addr,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
