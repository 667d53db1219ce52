//! Message-bus producer loop
//!
//! Reads serialized flows from its own queue and publishes one message per
//! flow. Independent of the accumulator's batch boundary.

use std::sync::Arc;

use async_channel::Receiver;
use contracts::{EncodedFlow, FlowPublisher};
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::{BusMetrics, BusSnapshot};

/// Log every Nth successful publish after the first
pub const SUCCESS_LOG_INTERVAL: u64 = 100;

/// Publish every flow from `flows` until the queue is closed and drained
///
/// Publish failures are logged and counted, never fatal.
#[instrument(
    name = "bus_sink_loop",
    skip(publisher, flows, metrics),
    fields(sink = %publisher.name())
)]
pub async fn run_bus_sink<P: FlowPublisher>(
    mut publisher: P,
    flows: Receiver<EncodedFlow>,
    metrics: Arc<BusMetrics>,
) -> BusSnapshot {
    let name = publisher.name().to_string();
    info!(sink = %name, "Bus producer started");

    while let Ok(flow) = flows.recv().await {
        match publisher.publish(&flow).await {
            Ok(delivery) => {
                let published = metrics.inc_published();
                observability::metrics::record_bus_publish(true);
                if published == 1 || published.is_multiple_of(SUCCESS_LOG_INTERVAL) {
                    info!(
                        sink = %name,
                        published,
                        partition = delivery.partition,
                        offset = delivery.offset,
                        "Flow delivered"
                    );
                }
            }
            Err(e) => {
                metrics.inc_failed();
                observability::metrics::record_bus_publish(false);
                warn!(sink = %name, error = %e, "Publish failed, flow dropped");
            }
        }
    }

    if let Err(e) = publisher.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    let snapshot = metrics.snapshot();
    debug!(
        sink = %name,
        published = snapshot.published,
        failed = snapshot.failed,
        "Bus producer stopped"
    );
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, Delivery};
    use std::sync::Mutex;

    struct MockPublisher {
        sent: Arc<Mutex<Vec<String>>>,
        fail_every: Option<usize>,
        calls: usize,
        closed: Arc<Mutex<bool>>,
    }

    impl FlowPublisher for MockPublisher {
        fn name(&self) -> &str {
            "kafka"
        }

        async fn publish(&mut self, flow: &EncodedFlow) -> Result<Delivery, ContractError> {
            self.calls += 1;
            if self.fail_every.is_some_and(|n| self.calls.is_multiple_of(n)) {
                return Err(ContractError::sink_write("kafka", "broker unavailable"));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(flow.to_string());
            Ok(Delivery {
                partition: 0,
                offset: sent.len() as i64 - 1,
            })
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    type Sent = Arc<Mutex<Vec<String>>>;

    fn publisher(fail_every: Option<usize>) -> (MockPublisher, Sent, Arc<Mutex<bool>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(false));
        (
            MockPublisher {
                sent: sent.clone(),
                fail_every,
                calls: 0,
                closed: closed.clone(),
            },
            sent,
            closed,
        )
    }

    #[tokio::test]
    async fn test_publishes_every_flow_in_order() {
        let (publisher, sent, closed) = publisher(None);
        let (tx, rx) = async_channel::bounded(8);

        let task = tokio::spawn(run_bus_sink(publisher, rx, Arc::new(BusMetrics::new())));
        for n in 0..5 {
            tx.send(EncodedFlow::from(format!("{{\"n\":{n}}}"))).await.unwrap();
        }
        drop(tx);

        let snapshot = task.await.unwrap();
        assert_eq!(snapshot, BusSnapshot { published: 5, failed: 0 });
        assert_eq!(sent.lock().unwrap()[4], "{\"n\":4}");
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        let (publisher, sent, _) = publisher(Some(2));
        let (tx, rx) = async_channel::bounded(8);

        let task = tokio::spawn(run_bus_sink(publisher, rx, Arc::new(BusMetrics::new())));
        for _ in 0..6 {
            tx.send(EncodedFlow::from("{}")).await.unwrap();
        }
        drop(tx);

        let snapshot = task.await.unwrap();
        assert_eq!(snapshot, BusSnapshot { published: 3, failed: 3 });
        assert_eq!(sent.lock().unwrap().len(), 3);
    }
}
