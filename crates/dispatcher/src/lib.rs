//! # Dispatcher
//!
//! 批次与 flow 的输出模块。
//!
//! 负责：
//! - 消费 accumulator 产出的 `Batch`
//! - Fan-out 到各批次 sink（本地文件、分布式文件系统）
//! - 隔离慢 sink / 失败 sink，不阻塞主链路
//! - 消息总线：逐条 flow 发布（`kafka` feature）

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{Batch, BatchSink, FlowPublisher};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DFS_SINK, LOCAL_FS_SINK};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{BusMetrics, BusSnapshot, MetricsSnapshot, SinkMetrics};
#[cfg(feature = "kafka")]
pub use sinks::{KafkaPublisher, TlsMaterial};
pub use sinks::{run_bus_sink, DfsSink, FileSink};
