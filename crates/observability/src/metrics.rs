//! 采集器指标
//!
//! 各阶段通过这些函数上报 `metrics` 指标；Prometheus exporter 启用时由其导出，
//! 未安装 recorder 时调用为空操作。

use contracts::NetFlowV5;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

pub const DATAGRAMS_RECEIVED: &str = "netflow_datagrams_received_total";
pub const DATAGRAMS_DROPPED: &str = "netflow_datagrams_dropped_total";
pub const RECEIVE_ERRORS: &str = "netflow_receive_errors_total";
pub const FLOWS_DECODED: &str = "netflow_flows_decoded_total";
pub const RECORDS_PER_FLOW: &str = "netflow_records_per_flow";
pub const DECODE_TASK_FAILURES: &str = "netflow_decode_task_failures_total";
pub const DECODES_IN_FLIGHT: &str = "netflow_decodes_in_flight";
pub const FANOUT_DROPPED: &str = "netflow_fanout_dropped_total";
pub const BATCHES_EMITTED: &str = "netflow_batches_emitted_total";
pub const LAST_BATCH_SEQUENCE: &str = "netflow_last_batch_sequence";
pub const BATCHES_WRITTEN: &str = "netflow_batches_written_total";
pub const BATCH_BYTES: &str = "netflow_batch_bytes";
pub const BUS_PUBLISH: &str = "netflow_bus_publish_total";

/// 批次写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Ok,
    Error,
    /// sink 队列已满，批次未入队
    QueueFull,
}

impl WriteOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::QueueFull => "queue_full",
        }
    }
}

/// 注册指标说明（exporter 安装后调用一次）
pub fn describe_metrics() {
    describe_counter!(DATAGRAMS_RECEIVED, "UDP datagrams received");
    describe_counter!(DATAGRAMS_DROPPED, "Datagrams dropped before decoding, by reason");
    describe_counter!(RECEIVE_ERRORS, "Socket receive errors");
    describe_counter!(FLOWS_DECODED, "Flows decoded and handed to the fan-out");
    describe_histogram!(RECORDS_PER_FLOW, "Records decoded per datagram");
    describe_counter!(DECODE_TASK_FAILURES, "Decode tasks that failed unexpectedly");
    describe_gauge!(DECODES_IN_FLIGHT, "Decode tasks currently running");
    describe_counter!(FANOUT_DROPPED, "Flows dropped because a consumer queue was full");
    describe_counter!(BATCHES_EMITTED, "Batches completed by the accumulator");
    describe_gauge!(LAST_BATCH_SEQUENCE, "Sequence number of the last emitted batch");
    describe_counter!(BATCHES_WRITTEN, "Batch writes per sink and outcome");
    describe_histogram!(BATCH_BYTES, "Serialized batch size in bytes");
    describe_counter!(BUS_PUBLISH, "Message-bus publishes per outcome");
}

pub fn record_datagram_received() {
    counter!(DATAGRAMS_RECEIVED).increment(1);
}

pub fn record_receive_error() {
    counter!(RECEIVE_ERRORS).increment(1);
}

/// 报文在解码前被丢弃
pub fn record_datagram_dropped(reason: &'static str) {
    counter!(DATAGRAMS_DROPPED, "reason" => reason).increment(1);
}

/// 一个 flow 解码完成
pub fn record_flow_decoded(flow: &NetFlowV5) {
    counter!(FLOWS_DECODED).increment(1);
    histogram!(RECORDS_PER_FLOW).record(flow.records.len() as f64);
}

pub fn record_decode_task_failure() {
    counter!(DECODE_TASK_FAILURES).increment(1);
}

pub fn record_decodes_in_flight(in_flight: usize) {
    gauge!(DECODES_IN_FLIGHT).set(in_flight as f64);
}

pub fn record_fanout_dropped(subscriber: &str) {
    counter!(FANOUT_DROPPED, "subscriber" => subscriber.to_string()).increment(1);
}

pub fn record_batch_emitted(sequence: usize) {
    counter!(BATCHES_EMITTED).increment(1);
    gauge!(LAST_BATCH_SEQUENCE).set(sequence as f64);
}

/// 批次写入结果；`bytes` 仅在成功时记录
pub fn record_batch_written(sink: &str, outcome: WriteOutcome, bytes: Option<usize>) {
    counter!(
        BATCHES_WRITTEN,
        "sink" => sink.to_string(),
        "status" => outcome.as_str()
    )
    .increment(1);
    if let Some(bytes) = bytes {
        histogram!(BATCH_BYTES, "sink" => sink.to_string()).record(bytes as f64);
    }
}

pub fn record_bus_publish(success: bool) {
    let status = if success { "ok" } else { "error" };
    counter!(BUS_PUBLISH, "status" => status).increment(1);
}
