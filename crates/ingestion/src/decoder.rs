//! Per-datagram decoding
//!
//! `FlowDecoder` enforces the length and version invariants before handing
//! fixed-size slices to the codec. `run_decode_task` is the unit of work the
//! listener spawns for every datagram.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use contracts::{
    EncodedFlow, HeaderFields, NetFlowV5, RecordFields, HEADER_LENGTH, NETFLOW_V5_VERSION,
    RECORD_LENGTH, RECORD_MAX_COUNT,
};
use tracing::{debug, error, trace, warn};

use crate::codec::{decode_header, decode_record, raw_count, raw_version};
use crate::config::IngestionMetrics;
use crate::error::DecodeError;
use crate::fanout::FlowFanout;

/// Decoded datagram plus how many declared records did not fit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDatagram {
    pub flow: NetFlowV5,
    /// Declared records (capped at 30) that the payload could not hold
    pub missing_records: usize,
}

/// NetFlow v5 datagram decoder
#[derive(Debug, Clone, Default)]
pub struct FlowDecoder {
    header_fields: HeaderFields,
    record_fields: RecordFields,
}

impl FlowDecoder {
    pub fn new(header_fields: HeaderFields, record_fields: RecordFields) -> Self {
        Self {
            header_fields,
            record_fields,
        }
    }

    /// Decode one datagram
    ///
    /// The record count is bounded by the declared count, the v5 maximum of 30,
    /// and the number of whole 48-byte slots in the payload. Version and count
    /// are read from the wire even when their toggles are off.
    pub fn decode(&self, datagram: &[u8]) -> Result<DecodedDatagram, DecodeError> {
        let header_bytes = datagram
            .first_chunk::<HEADER_LENGTH>()
            .ok_or(DecodeError::HeaderTooShort {
                len: datagram.len(),
            })?;

        let version = raw_version(header_bytes);
        if version != NETFLOW_V5_VERSION {
            return Err(DecodeError::UnsupportedVersion { version });
        }

        let header = decode_header(header_bytes, &self.header_fields);

        let declared = usize::from(raw_count(header_bytes)).min(RECORD_MAX_COUNT);
        let available = (datagram.len() - HEADER_LENGTH) / RECORD_LENGTH;
        let count = declared.min(available);

        let records = datagram[HEADER_LENGTH..]
            .chunks_exact(RECORD_LENGTH)
            .take(count)
            .filter_map(|chunk| <&[u8; RECORD_LENGTH]>::try_from(chunk).ok())
            .map(|slot| decode_record(slot, &self.record_fields))
            .collect();

        Ok(DecodedDatagram {
            flow: NetFlowV5 { header, records },
            missing_records: declared - count,
        })
    }
}

/// 单个报文的解码任务
///
/// 解码、序列化并投递到 fan-out。任何意外错误都在本任务内捕获并记录，
/// 不影响其他并发任务。
pub async fn run_decode_task(
    task_id: u64,
    datagram: Bytes,
    decoder: Arc<FlowDecoder>,
    fanout: FlowFanout,
    metrics: Arc<IngestionMetrics>,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| decode_and_encode(&decoder, &datagram)));

    let encoded = match outcome {
        Ok(Ok(Some((encoded, missing)))) => {
            if missing > 0 {
                metrics.record_truncated();
                debug!(
                    task_id,
                    missing,
                    len = datagram.len(),
                    "declared records exceed payload, truncated"
                );
            }
            encoded
        }
        Ok(Ok(None)) => return,
        Ok(Err(e)) => {
            metrics.record_dropped();
            observability::metrics::record_datagram_dropped(e.reason());
            trace!(task_id, error = %e, "datagram dropped");
            return;
        }
        Err(panic) => {
            metrics.record_task_failure();
            observability::metrics::record_decode_task_failure();
            error!(task_id, fault = %panic_message(&*panic), "decode task failed");
            return;
        }
    };

    match fanout.publish(encoded).await {
        Ok(_) => {
            metrics.record_decoded();
        }
        Err(e) => {
            warn!(task_id, error = %e, "decoded flow discarded");
        }
    }
}

/// `Ok(None)` means the flow could not be serialized (already logged)
fn decode_and_encode(
    decoder: &FlowDecoder,
    datagram: &[u8],
) -> Result<Option<(EncodedFlow, usize)>, DecodeError> {
    let decoded = decoder.decode(datagram)?;
    observability::metrics::record_flow_decoded(&decoded.flow);
    match EncodedFlow::encode(&decoded.flow) {
        Ok(encoded) => Ok(Some((encoded, decoded.missing_records))),
        Err(e) => {
            warn!(error = %e, "failed to serialize flow");
            Ok(None)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
