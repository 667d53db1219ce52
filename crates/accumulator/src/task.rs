//! Accumulator task loop

use async_channel::Receiver;
use contracts::{Batch, EncodedFlow};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::accumulator::Accumulator;

/// Accumulator 运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulatorStats {
    /// 读取的 flow 数
    pub flows_received: u64,
    /// 交给 dispatcher 的批次数
    pub batches_emitted: u64,
    /// 退出时仍在缓冲区中、未输出的 flow 数
    pub flows_pending: usize,
}

/// 串行读取 flow 队列并按 `chunk_size` 分批
///
/// 输入队列关闭（所有发送端 drop 或显式 close）时返回；
/// dispatcher 通道关闭时也提前返回。
pub async fn run_accumulator(
    flows: Receiver<EncodedFlow>,
    chunk_size: usize,
    batches: mpsc::Sender<Batch>,
) -> AccumulatorStats {
    let mut accumulator = Accumulator::new(chunk_size);
    let mut stats = AccumulatorStats::default();

    info!(chunk_size = accumulator.chunk_size(), "Accumulator started");

    while let Ok(flow) = flows.recv().await {
        stats.flows_received += 1;

        if stats.flows_received.is_multiple_of(100) {
            debug!(
                flows = stats.flows_received,
                pending = accumulator.pending(),
                "Accumulator progress"
            );
        }

        let Some(batch) = accumulator.push(flow) else {
            continue;
        };

        let sequence = batch.sequence;
        let size = batch.len();
        if batches.send(batch).await.is_err() {
            warn!(sequence, "Dispatcher channel closed");
            break;
        }

        stats.batches_emitted += 1;
        observability::metrics::record_batch_emitted(sequence);
        debug!(sequence, size, "Batch emitted");
    }

    stats.flows_pending = accumulator.pending();
    info!(
        flows = stats.flows_received,
        batches = stats.batches_emitted,
        pending = stats.flows_pending,
        "Accumulator stopped"
    );
    stats
}
