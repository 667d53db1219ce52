//! # Ingestion Pipeline
//!
//! NetFlow v5 ingestion module.
//!
//! Responsibilities:
//! - Bind the UDP listen address and receive datagrams
//! - Spawn one decode task per datagram (optionally bounded)
//! - Decode the v5 fixed binary layout into `NetFlowV5`
//! - Broadcast each serialized flow to every consumer queue
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{FlowFanout, FlowListener, ListenerConfig, Overflow};
//!
//! let mut fanout = FlowFanout::builder();
//! let flows = fanout.subscribe("accumulator", 1024, Overflow::Wait);
//!
//! let listener = FlowListener::bind(ListenerConfig::from_collector(&config), fanout.build()).await?;
//! tokio::spawn(listener.run_until(shutdown));
//!
//! while let Ok(flow) = flows.recv().await {
//!     // serialized NetFlowV5
//! }
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::{DatagramBuilder, MockExporter};
//!
//! let exporter = MockExporter::connect(addr).await?;
//! exporter.send(&DatagramBuilder::new().with_records(5).build()).await?;
//! ```

pub mod codec;
mod config;
mod decoder;
mod error;
mod fanout;
mod listener;
mod mock;

// Re-exports
pub use config::{IngestionMetrics, ListenerConfig, MetricsSnapshot};
pub use decoder::{run_decode_task, DecodedDatagram, FlowDecoder};
pub use error::{DecodeError, IngestionError, Result};
pub use fanout::{FlowFanout, FlowFanoutBuilder, Overflow};
pub use listener::FlowListener;
pub use mock::{DatagramBuilder, MockExporter, MockExporterConfig};
