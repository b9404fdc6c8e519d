//! Single-consumer worker that serializes all access to the serial endpoint.
//!
//! The physical port cannot serve two query cycles at once, so callers
//! never touch the collector directly: they send requests over a channel
//! to one spawned task that processes them strictly one at a time.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::collector::MachineDataCollector;
use crate::dispatcher::QueryDispatcher;
use crate::snapshot::{MachineSnapshot, MachineStatus};

const REQUEST_QUEUE_DEPTH: usize = 16;

/// A request sent from a caller to the telemetry worker task.
#[derive(Debug)]
pub enum TelemetryRequest {
    /// Probe the controller with the status query only.
    QueryStatus {
        respond_to: oneshot::Sender<Result<MachineStatus, String>>,
    },
    /// Read one macro variable (`Q600 <id>`).
    QueryVariable {
        id: u32,
        respond_to: oneshot::Sender<Result<String, String>>,
    },
    /// Assemble a full snapshot.
    GetSnapshot {
        respond_to: oneshot::Sender<MachineSnapshot>,
    },
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("telemetry worker is no longer running")]
    WorkerGone,
    #[error("{0}")]
    Dispatch(String),
}

/// Cloneable handle for talking to the worker task.
#[derive(Clone)]
pub struct TelemetryHandle {
    tx: mpsc::Sender<TelemetryRequest>,
}

impl TelemetryHandle {
    pub async fn status(&self) -> Result<MachineStatus, WorkerError> {
        let (respond_to, response) = oneshot::channel();
        self.send(TelemetryRequest::QueryStatus { respond_to }).await?;
        response
            .await
            .map_err(|_| WorkerError::WorkerGone)?
            .map_err(WorkerError::Dispatch)
    }

    pub async fn variable(&self, id: u32) -> Result<String, WorkerError> {
        let (respond_to, response) = oneshot::channel();
        self.send(TelemetryRequest::QueryVariable { id, respond_to }).await?;
        response
            .await
            .map_err(|_| WorkerError::WorkerGone)?
            .map_err(WorkerError::Dispatch)
    }

    /// Always yields a document; an unreachable machine or a failed poll
    /// cycle comes back as the Offline-shaped default.
    pub async fn snapshot(&self) -> Result<MachineSnapshot, WorkerError> {
        let (respond_to, response) = oneshot::channel();
        self.send(TelemetryRequest::GetSnapshot { respond_to }).await?;
        response.await.map_err(|_| WorkerError::WorkerGone)
    }

    async fn send(&self, request: TelemetryRequest) -> Result<(), WorkerError> {
        self.tx.send(request).await.map_err(|_| WorkerError::WorkerGone)
    }
}

/// Spawn the worker task owning the collector; the returned handle is the
/// only way in. The task exits when every handle has been dropped.
pub fn spawn<D>(collector: MachineDataCollector<D>) -> TelemetryHandle
where
    D: QueryDispatcher + 'static,
{
    let (tx, mut rx) = mpsc::channel::<TelemetryRequest>(REQUEST_QUEUE_DEPTH);

    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            match request {
                TelemetryRequest::QueryStatus { respond_to } => {
                    let result = collector.query_status().await.map_err(|e| e.to_string());
                    let _ = respond_to.send(result);
                }
                TelemetryRequest::QueryVariable { id, respond_to } => {
                    let result = collector.query_variable(id).await.map_err(|e| e.to_string());
                    let _ = respond_to.send(result);
                }
                TelemetryRequest::GetSnapshot { respond_to } => {
                    let _ = respond_to.send(collector.snapshot().await);
                }
            }
        }
        tracing::info!("Telemetry worker shutting down");
    });

    TelemetryHandle { tx }
}
