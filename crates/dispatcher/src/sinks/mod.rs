//! Sink implementations
//!
//! Batch sinks: FileSink, DfsSink. Per-flow publishing: the bus loop and, with
//! the `kafka` feature, KafkaPublisher.

mod bus;
mod dfs;
mod file;
#[cfg(feature = "kafka")]
mod kafka;

pub use self::bus::{run_bus_sink, SUCCESS_LOG_INTERVAL};
pub use self::dfs::DfsSink;
pub use self::file::FileSink;
#[cfg(feature = "kafka")]
pub use self::kafka::{KafkaPublisher, TlsMaterial, MAX_SEND_RETRIES};
