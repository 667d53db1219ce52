//! SinkHandle - one batch sink behind its own bounded queue and worker task
//!
//! A slow or failing sink only ever fills its own queue; when the queue is full
//! the batch is dropped for that sink and the others are unaffected.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{Batch, BatchSink};

use observability::metrics::{record_batch_written, WriteOutcome};

use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<Arc<Batch>>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker task for `sink`
    pub fn spawn<S: BatchSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a batch without waiting
    ///
    /// Returns false if the queue was full or the worker is gone (batch dropped
    /// for this sink only).
    pub fn try_send(&self, batch: Arc<Batch>) -> bool {
        match self.tx.try_send(batch) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(b)) => {
                self.metrics.record_dropped();
                record_batch_written(&self.name, WriteOutcome::QueueFull, None);
                warn!(
                    sink = %self.name,
                    sequence = b.sequence,
                    "Queue full, batch dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Shutdown the sink worker gracefully
    ///
    /// Queued batches are still written before the sink is closed.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Worker task that consumes batches and writes them to the sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: BatchSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Arc<Batch>>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(batch) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.write(&batch).await {
            Ok(bytes) => {
                metrics.record_written(bytes);
                record_batch_written(&name, WriteOutcome::Ok, Some(bytes));
                debug!(sink = %name, sequence = batch.sequence, bytes, "Batch written");
            }
            Err(e) => {
                // 不重试：该批次仅对本 sink 丢弃
                metrics.record_failed();
                record_batch_written(&name, WriteOutcome::Error, None);
                error!(
                    sink = %name,
                    sequence = batch.sequence,
                    error = %e,
                    "Write failed, batch dropped"
                );
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}
