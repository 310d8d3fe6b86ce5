//! Detached execution of recording pipelines.
//!
//! # Data Flow
//! ```text
//! RecordingTransport ──submit()──▶ bounded mpsc ──▶ worker ──spawn──▶ Recorder::record_and_log
//!                                                    (JoinSet, one task per exchange)
//! ```
//!
//! # Design Decisions
//! - `submit` never waits; a full queue drops the exchange with a warning
//! - Pipelines run concurrently, each on its own task
//! - The worker exits once every handle is dropped and in-flight pipelines finish

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::observability::metrics;
use crate::recording::recorder::Recorder;
use crate::recording::types::Exchange;

/// Submit handle for the recording worker.
#[derive(Debug, Clone)]
pub struct RecordingQueue {
    tx: mpsc::Sender<Exchange>,
}

impl RecordingQueue {
    /// Spawn the worker. The returned handle completes after the last
    /// `RecordingQueue` clone is dropped and all accepted exchanges are done.
    pub fn spawn(recorder: Arc<Recorder>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(recorder, rx));
        (Self { tx }, worker)
    }

    /// Hand an exchange to the worker. Returns false if it was dropped.
    pub fn submit(&self, exchange: Exchange) -> bool {
        match self.tx.try_send(exchange) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(exchange)) => {
                metrics::record_recording("queue_full");
                tracing::warn!(
                    request_id = %exchange.request_id,
                    url = %exchange.request.url,
                    "Recording queue full, exchange not recorded"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(exchange)) => {
                tracing::warn!(
                    request_id = %exchange.request_id,
                    "Recording worker stopped, exchange not recorded"
                );
                false
            }
        }
    }
}

async fn run_worker(recorder: Arc<Recorder>, mut rx: mpsc::Receiver<Exchange>) {
    let mut pipelines = JoinSet::new();

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(exchange) => {
                    let recorder = recorder.clone();
                    pipelines.spawn(async move { recorder.record_and_log(exchange).await });
                }
                None => break,
            },
            Some(joined) = pipelines.join_next(), if !pipelines.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Recording task panicked");
                }
            }
        }
    }

    tracing::debug!(in_flight = pipelines.len(), "Draining recording pipelines");
    while let Some(joined) = pipelines.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Recording task panicked");
        }
    }
    tracing::info!("Recording worker stopped");
}
