//! Pipeline orchestrator - wires listener, accumulator, dispatcher and bus sink.
//!
//! Start-up order: bus producer, flow fan-out, dispatcher, UDP listener. Any
//! failure before the listener runs is fatal. Shutdown runs the other way:
//! stop the listener, close the flow queues, let the accumulator and sinks
//! drain, then collect their statistics.
//!
//! 没有启用任何批次 sink 时不创建 accumulator 与 dispatcher。

use std::future::Future;
use std::time::{Duration, Instant};

use accumulator::AccumulatorStats;
use anyhow::{Context, Result};
use async_channel::Receiver;
use contracts::{Batch, CollectorConfig, EncodedFlow, KafkaConfig};
use dispatcher::{BusSnapshot, Dispatcher, MetricsSnapshot as SinkSnapshot};
use ingestion::{FlowFanout, FlowListener, ListenerConfig, Overflow};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Fan-out subscriber feeding the accumulator
const ACCUMULATOR_SUBSCRIBER: &str = "accumulator";
/// Fan-out subscriber feeding the message bus
const BUS_SUBSCRIBER: &str = "kafka";
/// Upper bound on waiting for a stage to drain after the listener stops
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Main pipeline orchestrator
pub struct Pipeline {
    config: CollectorConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, then drain every stage
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()> + Send,
    {
        let start_time = Instant::now();
        let config = self.config;

        // Flow fan-out: the accumulator applies backpressure, the bus never blocks it
        let mut fanout_builder = FlowFanout::builder();
        let flows_rx = if config.batch_sinks_enabled() {
            Some(fanout_builder.subscribe(
                ACCUMULATOR_SUBSCRIBER,
                config.flow_queue_capacity,
                Overflow::Wait,
            ))
        } else {
            info!("No batch output enabled, accumulator not started");
            None
        };

        let bus_handle = if config.bus_enabled() {
            let bus_rx = fanout_builder.subscribe(
                BUS_SUBSCRIBER,
                config.flow_queue_capacity,
                Overflow::DropNewest,
            );
            Some(spawn_bus_sink(&config.output.kafka, bus_rx)?)
        } else {
            info!("Kafka output disabled");
            None
        };
        let fanout = fanout_builder.build();

        // Dispatcher
        let batch_stage = match flows_rx {
            Some(flows_rx) => {
                let (batch_tx, batch_rx) = mpsc::channel(config.output.sink_queue_capacity);
                let dispatcher = dispatcher::create_dispatcher(&config.output, batch_rx)
                    .await
                    .context("Failed to create dispatcher")?;
                Some((flows_rx, batch_tx, dispatcher))
            }
            None => None,
        };
        let active_sinks = batch_stage
            .as_ref()
            .map(|(_, _, dispatcher)| dispatcher.sink_names())
            .unwrap_or_default();

        // Listener
        let listener = FlowListener::bind(ListenerConfig::from_collector(&config), fanout.clone())
            .await
            .map_err(|e| CliError::startup("listener", e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read listener address")?;

        let batch_handles = batch_stage.map(|(flows_rx, batch_tx, dispatcher)| {
            spawn_batch_stage(flows_rx, batch_tx, dispatcher, config.output.chunk_size)
        });

        info!(
            listen = %local_addr,
            chunk_size = config.output.chunk_size,
            sinks = ?active_sinks,
            kafka = bus_handle.is_some(),
            "Collector running"
        );

        let ingestion = listener.run_until(shutdown).await;

        info!("Listener stopped, draining pipeline...");
        fanout.close();
        let fanout_dropped = fanout.dropped();
        drop(fanout);

        let (accumulator, sinks) = match batch_handles {
            Some((accumulator_handle, dispatcher_handle)) => {
                let accumulator = await_stage("accumulator", accumulator_handle)
                    .await
                    .unwrap_or_default();
                if accumulator.flows_pending > 0 {
                    info!(
                        flows = accumulator.flows_pending,
                        "Partial batch discarded on shutdown"
                    );
                }
                let sinks = await_stage("dispatcher", dispatcher_handle)
                    .await
                    .unwrap_or_default();
                (accumulator, sinks)
            }
            None => Default::default(),
        };

        let bus = match bus_handle {
            Some(handle) => await_stage("kafka", handle).await,
            None => None,
        };

        let stats = PipelineStats {
            duration: start_time.elapsed(),
            ingestion,
            accumulator,
            sinks,
            bus,
            fanout_dropped,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            flows_per_sec = format!("{:.2}", stats.flows_per_sec()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Spawn the dispatcher and the accumulator feeding it
fn spawn_batch_stage(
    flows_rx: Receiver<EncodedFlow>,
    batch_tx: mpsc::Sender<Batch>,
    dispatcher: Dispatcher,
    chunk_size: usize,
) -> (
    JoinHandle<AccumulatorStats>,
    JoinHandle<Vec<(String, SinkSnapshot)>>,
) {
    let dispatcher_handle = dispatcher.spawn();
    let accumulator_handle =
        tokio::spawn(accumulator::run_accumulator(flows_rx, chunk_size, batch_tx));
    (accumulator_handle, dispatcher_handle)
}

/// Wait for a stage task, bounded by `DRAIN_TIMEOUT`
async fn await_stage<T>(stage: &'static str, handle: JoinHandle<T>) -> Option<T> {
    match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(stage, error = %e, "Stage task failed");
            None
        }
        Err(_) => {
            warn!(
                stage,
                timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "Stage did not drain in time"
            );
            None
        }
    }
}

/// Create the Kafka producer and spawn its publish loop
#[cfg(feature = "kafka")]
fn spawn_bus_sink(
    config: &KafkaConfig,
    flows: Receiver<EncodedFlow>,
) -> Result<JoinHandle<BusSnapshot>> {
    let publisher = dispatcher::KafkaPublisher::new(BUS_SUBSCRIBER, config)
        .context("Failed to create Kafka producer")?;
    let metrics = std::sync::Arc::new(dispatcher::BusMetrics::new());
    Ok(tokio::spawn(dispatcher::run_bus_sink(
        publisher, flows, metrics,
    )))
}

#[cfg(not(feature = "kafka"))]
fn spawn_bus_sink(
    _config: &KafkaConfig,
    _flows: Receiver<EncodedFlow>,
) -> Result<JoinHandle<BusSnapshot>> {
    Err(dispatcher::DispatcherError::Unsupported {
        name: BUS_SUBSCRIBER.to_string(),
        feature: "kafka",
    }
    .into())
}
