//! Sink traits - Dispatcher output interfaces
//!
//! `BatchSink` receives completed batches (file, DFS).
//! `FlowPublisher` receives single flows (message bus).

use crate::{Batch, ContractError, EncodedFlow};

/// Batch output trait
///
/// All batch sink implementations must implement this trait.
#[trait_variant::make(BatchSink: Send)]
pub trait LocalBatchSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one completed batch, returning the number of bytes written
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, batch: &Batch) -> Result<usize, ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Where a published flow landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// Per-flow publish trait
#[trait_variant::make(FlowPublisher: Send)]
pub trait LocalFlowPublisher {
    /// Publisher name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Publish one flow and wait for its acknowledgement
    async fn publish(&mut self, flow: &EncodedFlow) -> Result<Delivery, ContractError>;

    /// Close publisher, flushing anything still in flight
    async fn close(&mut self) -> Result<(), ContractError>;
}
