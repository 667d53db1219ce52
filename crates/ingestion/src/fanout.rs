//! Flow fan-out
//!
//! Every decoded flow is delivered to every subscriber: each consumer category
//! (accumulator, bus producer) owns an independent bounded queue, and one
//! `publish` call fills all of them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::EncodedFlow;
use tracing::warn;

use crate::error::{IngestionError, Result};

/// 首次丢弃之后每隔多少个 flow 打一次 warn
const DROP_WARN_INTERVAL: u64 = 1000;

/// 队列满时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// 等待消费者腾出空间（解码任务在此挂起）
    Wait,
    /// 丢弃当前 flow，只影响该订阅者
    DropNewest,
}

#[derive(Debug)]
struct Subscriber {
    name: String,
    tx: Sender<EncodedFlow>,
    overflow: Overflow,
    dropped: AtomicU64,
}

impl Subscriber {
    fn record_drop(&self) {
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        observability::metrics::record_fanout_dropped(&self.name);
        if dropped == 1 || dropped % DROP_WARN_INTERVAL == 0 {
            warn!(
                subscriber = %self.name,
                dropped,
                capacity = ?self.tx.capacity(),
                "flow queue full, dropping flows"
            );
        }
    }
}

/// Broadcast handle shared by all decode tasks
///
/// Cloning is cheap; all clones publish into the same set of queues.
#[derive(Debug, Clone, Default)]
pub struct FlowFanout {
    subscribers: Arc<Vec<Subscriber>>,
}

/// Builder collecting subscribers before the pipeline starts
#[derive(Debug, Default)]
pub struct FlowFanoutBuilder {
    subscribers: Vec<Subscriber>,
}

impl FlowFanoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer and return its private queue
    pub fn subscribe(
        &mut self,
        name: impl Into<String>,
        capacity: usize,
        overflow: Overflow,
    ) -> Receiver<EncodedFlow> {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        self.subscribers.push(Subscriber {
            name: name.into(),
            tx,
            overflow,
            dropped: AtomicU64::new(0),
        });
        rx
    }

    pub fn build(self) -> FlowFanout {
        FlowFanout {
            subscribers: Arc::new(self.subscribers),
        }
    }
}

impl FlowFanout {
    pub fn builder() -> FlowFanoutBuilder {
        FlowFanoutBuilder::new()
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Flows dropped so far, per subscriber in registration order
    pub fn dropped(&self) -> Vec<(String, u64)> {
        self.subscribers
            .iter()
            .map(|s| (s.name.clone(), s.dropped.load(Ordering::Relaxed)))
            .collect()
    }

    /// Total flows dropped across all subscribers
    pub fn total_dropped(&self) -> u64 {
        self.subscribers
            .iter()
            .map(|s| s.dropped.load(Ordering::Relaxed))
            .sum()
    }

    /// Deliver `flow` to every open subscriber
    ///
    /// Returns how many queues accepted it. Fails only when every subscriber has
    /// gone away.
    pub async fn publish(&self, flow: EncodedFlow) -> Result<usize> {
        let mut delivered = 0;
        let mut open = 0;

        for subscriber in self.subscribers.iter() {
            if subscriber.tx.is_closed() {
                continue;
            }
            open += 1;

            match subscriber.overflow {
                Overflow::Wait => {
                    if subscriber.tx.send(flow.clone()).await.is_ok() {
                        delivered += 1;
                    } else {
                        warn!(subscriber = %subscriber.name, "flow queue closed");
                    }
                }
                Overflow::DropNewest => match subscriber.tx.try_send(flow.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => subscriber.record_drop(),
                    Err(TrySendError::Closed(_)) => {
                        warn!(subscriber = %subscriber.name, "flow queue closed");
                    }
                },
            }
        }

        if open == 0 && !self.subscribers.is_empty() {
            return Err(IngestionError::ChannelClosed);
        }
        Ok(delivered)
    }

    /// Close every queue; consumers drain what is left and then see end-of-stream
    pub fn close(&self) {
        for subscriber in self.subscribers.iter() {
            subscriber.tx.close();
        }
    }
}
