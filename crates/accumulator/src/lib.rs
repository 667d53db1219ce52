//! # Accumulator
//!
//! 将 flow 按固定大小分批。
//!
//! 负责：
//! - 从 flow 队列串行读取序列化后的 flow
//! - 满 `ChunkSize` 即产出一个 `Batch` 并交给 dispatcher
//! - 维护批次序号（溢出时回绕到 0）
//!
//! 不做基于时间的刷新：最后一个不满的批次在进程退出时不会输出。
//!
//! ## 使用示例
//!
//! ```ignore
//! use accumulator::Accumulator;
//!
//! let mut accumulator = Accumulator::new(100);
//!
//! if let Some(batch) = accumulator.push(flow) {
//!     // batch.len() == 100
//! }
//! ```

mod accumulator;
mod task;

pub use accumulator::Accumulator;
pub use contracts::{Batch, EncodedFlow};
pub use task::{run_accumulator, AccumulatorStats};
