//! The per-exchange recording pipeline.

use std::sync::Arc;

use uuid::Uuid;

use crate::observability::metrics;
use crate::recording::admin::AdminApi;
use crate::recording::mapping::{MappingBuilder, StubMapping};
use crate::recording::types::Exchange;
use crate::recording::RecordingError;

/// Turns exchanges into stored body files and stub mappings.
pub struct Recorder {
    builder: MappingBuilder,
    admin: Arc<dyn AdminApi>,
}

impl Recorder {
    pub fn new(builder: MappingBuilder, admin: Arc<dyn AdminApi>) -> Self {
        Self { builder, admin }
    }

    /// Record one exchange under a fresh token.
    ///
    /// The mapping is built first so a body that cannot be sanitized aborts
    /// before anything reaches the mock server. The body file must be stored
    /// before the mapping that references it is created.
    pub async fn record(&self, exchange: &Exchange) -> Result<StubMapping, RecordingError> {
        let token = Uuid::new_v4();
        let mapping = self
            .builder
            .build(&exchange.request, &exchange.response, token)?;

        self.admin
            .store_body_file(token, exchange.response.body.clone())
            .await?;
        self.admin.create_mapping(&mapping).await?;

        Ok(mapping)
    }

    /// Record and report the outcome. Failures end here.
    pub async fn record_and_log(&self, exchange: Exchange) {
        match self.record(&exchange).await {
            Ok(mapping) => {
                metrics::record_recording("recorded");
                tracing::info!(
                    request_id = %exchange.request_id,
                    method = %exchange.request.method,
                    url = %exchange.request.url,
                    token = %mapping.id,
                    "Stub mapping recorded"
                );
            }
            Err(e) => {
                metrics::record_recording(e.kind());
                tracing::error!(
                    request_id = %exchange.request_id,
                    method = %exchange.request.method,
                    url = %exchange.request.url,
                    error = %e,
                    "Failed to record stub mapping"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::admin::AdminError;
    use crate::recording::sanitizer::Sanitizer;
    use crate::recording::types::{CapturedRequest, CapturedResponse};
    use async_trait::async_trait;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeAdmin {
        fail_store: bool,
        fail_create: bool,
        stores: AtomicUsize,
        creates: AtomicUsize,
        files: Mutex<Vec<(Uuid, Bytes)>>,
    }

    #[async_trait]
    impl AdminApi for FakeAdmin {
        async fn store_body_file(&self, token: Uuid, body: Bytes) -> Result<(), AdminError> {
            self.stores.fetch_add(1, Ordering::SeqCst);
            if self.fail_store {
                return Err(AdminError::Status {
                    endpoint: "files".into(),
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                });
            }
            self.files.lock().unwrap().push((token, body));
            Ok(())
        }

        async fn create_mapping(&self, _mapping: &StubMapping) -> Result<(), AdminError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if self.fail_create {
                return Err(AdminError::Status {
                    endpoint: "mappings".into(),
                    status: StatusCode::BAD_REQUEST,
                });
            }
            Ok(())
        }
    }

    fn exchange(method: Method, body: &str) -> Exchange {
        Exchange {
            request_id: "req-1".into(),
            request: CapturedRequest {
                method,
                url: "/orders".into(),
                body: Bytes::from(body.to_string()),
            },
            response: CapturedResponse::new(
                StatusCode::CREATED,
                &HeaderMap::new(),
                Bytes::from_static(br#"{"status":"ok"}"#),
            ),
        }
    }

    fn recorder(admin: Arc<FakeAdmin>) -> Recorder {
        Recorder::new(MappingBuilder::new(Sanitizer::new(["modifiedOn"])), admin)
    }

    #[tokio::test]
    async fn stores_file_then_creates_mapping_under_one_token() {
        let admin = Arc::new(FakeAdmin::default());
        let mapping = recorder(admin.clone())
            .record(&exchange(Method::POST, r#"{"id":1}"#))
            .await
            .unwrap();

        let files = admin.files.lock().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, mapping.id);
        assert_eq!(&files[0].1[..], br#"{"status":"ok"}"#);
        assert_eq!(mapping.response.body_file_name, mapping.uuid.to_string());
        assert_eq!(admin.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_file_store_skips_mapping() {
        let admin = Arc::new(FakeAdmin {
            fail_store: true,
            ..Default::default()
        });
        let err = recorder(admin.clone())
            .record(&exchange(Method::GET, ""))
            .await
            .unwrap_err();

        assert!(matches!(err, RecordingError::Admin(_)));
        assert_eq!(admin.stores.load(Ordering::SeqCst), 1);
        assert_eq!(admin.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unparseable_body_makes_no_admin_calls() {
        let admin = Arc::new(FakeAdmin::default());
        let err = recorder(admin.clone())
            .record(&exchange(Method::POST, "<order/>"))
            .await
            .unwrap_err();

        assert!(matches!(err, RecordingError::Parse(_)));
        assert_eq!(admin.stores.load(Ordering::SeqCst), 0);
        assert_eq!(admin.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_mapping_is_reported() {
        let admin = Arc::new(FakeAdmin {
            fail_create: true,
            ..Default::default()
        });
        let err = recorder(admin.clone())
            .record(&exchange(Method::PUT, "{}"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "admin_error");
        assert_eq!(admin.stores.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn each_exchange_gets_a_distinct_token() {
        let admin = Arc::new(FakeAdmin::default());
        let recorder = recorder(admin.clone());
        let first = recorder.record(&exchange(Method::GET, "")).await.unwrap();
        let second = recorder.record(&exchange(Method::GET, "")).await.unwrap();

        assert_ne!(first.id, second.id);
        let files = admin.files.lock().unwrap();
        assert_eq!(files[0].0, first.id);
        assert_eq!(files[1].0, second.id);
    }

    #[tokio::test]
    async fn record_and_log_swallows_failures() {
        let admin = Arc::new(FakeAdmin {
            fail_store: true,
            ..Default::default()
        });
        recorder(admin.clone())
            .record_and_log(exchange(Method::POST, r#"{"a":1}"#))
            .await;
        assert_eq!(admin.creates.load(Ordering::SeqCst), 0);
    }
}
