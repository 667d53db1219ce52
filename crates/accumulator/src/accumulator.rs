//! 批次累积器

use contracts::{Batch, EncodedFlow};

/// First sequence number handed out
const FIRST_SEQUENCE: usize = 1;

/// 预分配上限，更大的批次按需增长
const MAX_PREALLOCATED_FLOWS: usize = 4096;

/// Fixed-size batch accumulator
///
/// Owns the growing buffer until it reaches `chunk_size`, then hands the whole
/// buffer out as a `Batch` and starts a fresh one.
#[derive(Debug)]
pub struct Accumulator {
    chunk_size: usize,
    buffer: Vec<EncodedFlow>,
    next_sequence: usize,
    emitted: u64,
}

impl Accumulator {
    /// `chunk_size` 为 0 时按 1 处理
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            buffer: fresh_buffer(chunk_size),
            next_sequence: FIRST_SEQUENCE,
            emitted: 0,
        }
    }

    /// 从指定序号开始编号
    pub fn starting_at(chunk_size: usize, sequence: usize) -> Self {
        Self {
            next_sequence: sequence,
            ..Self::new(chunk_size)
        }
    }

    /// Append one flow; returns the completed batch when the buffer fills
    pub fn push(&mut self, flow: EncodedFlow) -> Option<Batch> {
        self.buffer.push(flow);
        if self.buffer.len() < self.chunk_size {
            return None;
        }

        let flows = std::mem::replace(&mut self.buffer, fresh_buffer(self.chunk_size));
        let batch = Batch::new(self.next_sequence, flows);
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.emitted += 1;
        Some(batch)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Flows currently buffered (never flushed on their own)
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Sequence number the next batch will carry
    pub fn next_sequence(&self) -> usize {
        self.next_sequence
    }

    /// Batches emitted so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

fn fresh_buffer(chunk_size: usize) -> Vec<EncodedFlow> {
    Vec::with_capacity(chunk_size.min(MAX_PREALLOCATED_FLOWS))
}
