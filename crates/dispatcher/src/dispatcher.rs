//! Dispatcher - main loop for fan-out of batches to sinks

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use contracts::{Batch, OutputConfig};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{DfsSink, FileSink};

/// Sink name used for the local filesystem output
pub const LOCAL_FS_SINK: &str = "local_fs";
/// Sink name used for the distributed filesystem output
pub const DFS_SINK: &str = "hdfs";

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: OutputConfig,
    input_rx: mpsc::Receiver<Batch>,
}

impl DispatcherBuilder {
    pub fn new(config: OutputConfig, input_rx: mpsc::Receiver<Batch>) -> Self {
        Self { config, input_rx }
    }

    /// Build the dispatcher with one handle per enabled batch sink
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config)?;

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }

    fn initialize_handles(config: &OutputConfig) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut handles = Vec::new();
        let capacity = config.sink_queue_capacity;

        if config.local_fs.enabled {
            let sink = FileSink::new(LOCAL_FS_SINK, &config.local_fs.path)
                .map_err(|e| DispatcherError::sink_creation(LOCAL_FS_SINK, e.to_string()))?;
            info!(sink = LOCAL_FS_SINK, dir = %config.local_fs.path, "Batch sink enabled");
            handles.push(SinkHandle::spawn(sink, capacity));
        }

        if config.dfs.enabled {
            let sink = DfsSink::from_url(DFS_SINK, &config.dfs.path)
                .map_err(|e| DispatcherError::sink_creation(DFS_SINK, e.to_string()))?;
            info!(sink = DFS_SINK, url = %config.dfs.path, "Batch sink enabled");
            handles.push(SinkHandle::spawn(sink, capacity));
        }

        Ok(handles)
    }
}

/// The main Dispatcher that fans out batches to sinks
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<Batch>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>, input_rx: mpsc::Receiver<Batch>) -> Self {
        Self { handles, input_rx }
    }

    /// Names of the attached sinks
    pub fn sink_names(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.name().to_string()).collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Returns per-sink metrics once the input channel is closed and every sink
    /// has drained its queue.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        info!(sinks = self.handles.len(), "Dispatcher started");
        if self.handles.is_empty() {
            warn!("No batch sinks enabled - batches will be discarded");
        }

        let mut batch_count: u64 = 0;

        while let Some(batch) = self.input_rx.recv().await {
            batch_count += 1;
            self.dispatch_batch(Arc::new(batch));

            if batch_count.is_multiple_of(100) {
                debug!(batches = batch_count, "Dispatcher progress");
            }
        }

        info!(batches = batch_count, "Dispatcher input closed, shutting down");

        let metrics = Self::shutdown_handles(self.handles).await;

        info!("Dispatcher shutdown complete");
        metrics
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }

    fn dispatch_batch(&self, batch: Arc<Batch>) {
        for handle in &self.handles {
            handle.try_send(Arc::clone(&batch));
        }
    }

    async fn shutdown_handles(handles: Vec<SinkHandle>) -> Vec<(String, MetricsSnapshot)> {
        let mut metrics = Vec::with_capacity(handles.len());
        for handle in handles {
            let name = handle.name().to_string();
            let sink_metrics = Arc::clone(handle.metrics());
            handle.shutdown().await;
            metrics.push((name, sink_metrics.snapshot()));
        }
        metrics
    }
}

/// Convenience function to create a dispatcher from the output configuration
#[instrument(name = "dispatcher_create", skip(config, input_rx))]
pub async fn create_dispatcher(
    config: &OutputConfig,
    input_rx: mpsc::Receiver<Batch>,
) -> Result<Dispatcher, DispatcherError> {
    DispatcherBuilder::new(config.clone(), input_rx).build().await
}
