//! CollectorConfig - Config Loader 输出
//!
//! 进程级配置：监听地址、批大小、各 sink 的目的地、以及 v5 头部/记录字段开关。
//! 启动时构造一次，之后只读，按引用或 `Arc` 共享给各组件。
//!
//! JSON 键名沿用既有部署的配置文件格式 (`ListenParams`, `Output`, `ConfigV5Header` ...)，
//! 同时接受 snake_case 别名以便 TOML 书写。

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 完整的采集器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CollectorConfig {
    /// UDP 监听地址 `[address]:port`
    #[serde(rename = "ListenParams", alias = "listen_address")]
    #[validate(length(min = 1, message = "listen address cannot be empty"))]
    pub listen_address: String,

    /// 每个消费者 (accumulator / bus) 的 flow 队列容量
    #[serde(
        rename = "FlowQueueCapacity",
        alias = "flow_queue_capacity",
        default = "default_flow_queue_capacity"
    )]
    #[validate(range(min = 1))]
    pub flow_queue_capacity: usize,

    /// 同时进行的解码任务上限 (None = 不限)
    #[serde(
        rename = "MaxInFlightDecodes",
        alias = "max_in_flight_decodes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[validate(range(min = 1))]
    pub max_in_flight_decodes: Option<usize>,

    /// 输出配置
    #[serde(rename = "Output", alias = "output")]
    #[validate(nested)]
    pub output: OutputConfig,

    /// 头部字段开关
    #[serde(rename = "ConfigV5Header", alias = "header_fields", default)]
    pub header_fields: HeaderFields,

    /// 记录字段开关
    #[serde(rename = "ConfigV5Record", alias = "record_fields", default)]
    pub record_fields: RecordFields,
}

fn default_flow_queue_capacity() -> usize {
    1024
}

impl CollectorConfig {
    /// Whether any batch sink (local file or DFS) is enabled
    pub fn batch_sinks_enabled(&self) -> bool {
        self.output.local_fs.enabled || self.output.dfs.enabled
    }

    /// Whether the message-bus sink is enabled
    pub fn bus_enabled(&self) -> bool {
        self.output.kafka.enabled
    }

    /// Listen address with an empty host (`:2055`) expanded to all interfaces
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }
}

/// Upper bound accepted for `Output.ChunkSize`
pub const MAX_CHUNK_SIZE: usize = 1_000_000;

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutputConfig {
    /// 每个批次的 flow 数量
    #[serde(rename = "ChunkSize", alias = "chunk_size")]
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "chunk size must be between 1 and 1000000"
    ))]
    pub chunk_size: usize,

    /// 每个批次 sink 的队列容量
    #[serde(
        rename = "SinkQueueCapacity",
        alias = "sink_queue_capacity",
        default = "default_sink_queue_capacity"
    )]
    #[validate(range(min = 1))]
    pub sink_queue_capacity: usize,

    /// 本地文件系统输出
    #[serde(rename = "LocalFS", alias = "local_fs", default)]
    pub local_fs: LocalFsConfig,

    /// 分布式文件系统输出
    #[serde(rename = "HDFS", alias = "dfs", default)]
    pub dfs: DfsConfig,

    /// 消息总线输出
    #[serde(rename = "Kafka", alias = "kafka", default)]
    pub kafka: KafkaConfig,
}

fn default_sink_queue_capacity() -> usize {
    16
}

/// Local filesystem sink
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalFsConfig {
    #[serde(default, alias = "enabled")]
    pub enabled: bool,

    /// Output directory
    #[serde(default, alias = "path")]
    pub path: String,
}

/// Distributed filesystem sink
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DfsConfig {
    #[serde(default, alias = "enabled")]
    pub enabled: bool,

    /// Destination URL, e.g. `file:///data/flows` or `s3://bucket/flows`
    #[serde(default, alias = "path", alias = "url")]
    pub path: String,
}

/// Message-bus (Kafka) sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KafkaConfig {
    #[serde(default, alias = "enabled")]
    pub enabled: bool,

    /// `host:port` bootstrap brokers
    #[serde(default, alias = "broker_list")]
    pub broker_list: Vec<String>,

    #[serde(default, alias = "topic")]
    pub topic: String,

    /// Per-message delivery timeout
    #[serde(default = "default_message_timeout_ms", alias = "message_timeout_ms")]
    pub message_timeout_ms: u64,

    #[serde(rename = "TLS", alias = "tls", default)]
    pub tls: KafkaTlsConfig,
}

fn default_message_timeout_ms() -> u64 {
    5000
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker_list: Vec::new(),
            topic: String::new(),
            message_timeout_ms: default_message_timeout_ms(),
            tls: KafkaTlsConfig::default(),
        }
    }
}

/// Transport encryption material for the bus producer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KafkaTlsConfig {
    #[serde(default, alias = "enabled")]
    pub enabled: bool,

    /// Client certificate (PEM)
    #[serde(default, alias = "cert_file_path")]
    pub cert_file_path: String,

    /// Client private key (PEM)
    #[serde(default, alias = "key_file_path")]
    pub key_file_path: String,

    /// Trusted CA bundle (PEM)
    #[serde(rename = "CAFilePath", default, alias = "ca_file_path")]
    pub ca_file_path: String,
}

/// Enable switches for v5 header fields
///
/// A disabled field is not decoded and keeps its zero value.
/// 整个表缺省时全部启用；表存在时未列出的键视为关闭。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default = "HeaderFields::none")]
pub struct HeaderFields {
    #[serde(alias = "version")]
    pub version: bool,
    #[serde(alias = "count")]
    pub count: bool,
    #[serde(alias = "sys_uptime")]
    pub sys_uptime: bool,
    #[serde(alias = "timestamp")]
    pub timestamp: bool,
    #[serde(alias = "flow_sequence")]
    pub flow_sequence: bool,
    #[serde(alias = "engine_type")]
    pub engine_type: bool,
    #[serde(rename = "EngineID", alias = "engine_id")]
    pub engine_id: bool,
    #[serde(alias = "sampling_interval")]
    pub sampling_interval: bool,
}

impl HeaderFields {
    pub fn all() -> Self {
        Self {
            version: true,
            count: true,
            sys_uptime: true,
            timestamp: true,
            flow_sequence: true,
            engine_type: true,
            engine_id: true,
            sampling_interval: true,
        }
    }

    pub fn none() -> Self {
        Self {
            version: false,
            count: false,
            sys_uptime: false,
            timestamp: false,
            flow_sequence: false,
            engine_type: false,
            engine_id: false,
            sampling_interval: false,
        }
    }

    /// Names of the disabled fields, in wire order
    pub fn disabled(&self) -> Vec<&'static str> {
        [
            ("Version", self.version),
            ("Count", self.count),
            ("SysUptime", self.sys_uptime),
            ("Timestamp", self.timestamp),
            ("FlowSequence", self.flow_sequence),
            ("EngineType", self.engine_type),
            ("EngineID", self.engine_id),
            ("SamplingInterval", self.sampling_interval),
        ]
        .into_iter()
        .filter_map(|(name, enabled)| (!enabled).then_some(name))
        .collect()
    }
}

impl Default for HeaderFields {
    fn default() -> Self {
        Self::all()
    }
}

/// Enable switches for v5 record fields
///
/// Same defaulting rule as [`HeaderFields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default = "RecordFields::none")]
pub struct RecordFields {
    #[serde(alias = "src_addr")]
    pub src_addr: bool,
    #[serde(alias = "dst_addr")]
    pub dst_addr: bool,
    #[serde(alias = "next_hop")]
    pub next_hop: bool,
    #[serde(alias = "input")]
    pub input: bool,
    #[serde(alias = "output")]
    pub output: bool,
    #[serde(alias = "d_pkts")]
    pub d_pkts: bool,
    #[serde(alias = "d_octets")]
    pub d_octets: bool,
    #[serde(alias = "first")]
    pub first: bool,
    #[serde(alias = "last")]
    pub last: bool,
    #[serde(alias = "src_port")]
    pub src_port: bool,
    #[serde(alias = "dst_port")]
    pub dst_port: bool,
    #[serde(rename = "TCPFlags", alias = "tcp_flags")]
    pub tcp_flags: bool,
    #[serde(alias = "prot")]
    pub prot: bool,
    #[serde(alias = "tos")]
    pub tos: bool,
    #[serde(alias = "src_as")]
    pub src_as: bool,
    #[serde(alias = "dst_as")]
    pub dst_as: bool,
    #[serde(alias = "src_mask")]
    pub src_mask: bool,
    #[serde(alias = "dst_mask")]
    pub dst_mask: bool,
}

impl RecordFields {
    pub fn all() -> Self {
        Self::uniform(true)
    }

    pub fn none() -> Self {
        Self::uniform(false)
    }

    fn uniform(enabled: bool) -> Self {
        Self {
            src_addr: enabled,
            dst_addr: enabled,
            next_hop: enabled,
            input: enabled,
            output: enabled,
            d_pkts: enabled,
            d_octets: enabled,
            first: enabled,
            last: enabled,
            src_port: enabled,
            dst_port: enabled,
            tcp_flags: enabled,
            prot: enabled,
            tos: enabled,
            src_as: enabled,
            dst_as: enabled,
            src_mask: enabled,
            dst_mask: enabled,
        }
    }

    /// Names of the disabled fields, in wire order
    pub fn disabled(&self) -> Vec<&'static str> {
        [
            ("SrcAddr", self.src_addr),
            ("DstAddr", self.dst_addr),
            ("NextHop", self.next_hop),
            ("Input", self.input),
            ("Output", self.output),
            ("DPkts", self.d_pkts),
            ("DOctets", self.d_octets),
            ("First", self.first),
            ("Last", self.last),
            ("SrcPort", self.src_port),
            ("DstPort", self.dst_port),
            ("TCPFlags", self.tcp_flags),
            ("Prot", self.prot),
            ("Tos", self.tos),
            ("SrcAs", self.src_as),
            ("DstAs", self.dst_as),
            ("SrcMask", self.src_mask),
            ("DstMask", self.dst_mask),
        ]
        .into_iter()
        .filter_map(|(name, enabled)| (!enabled).then_some(name))
        .collect()
    }
}

impl Default for RecordFields {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_legacy_json() {
        let content = r#"{
            "ListenParams": "0.0.0.0:2055",
            "Output": {
                "ChunkSize": 500,
                "LocalFS": { "Enabled": true, "Path": "/var/flows" },
                "HDFS": { "Enabled": false, "Path": "" },
                "Kafka": {
                    "Enabled": true,
                    "BrokerList": ["kafka-1:9093", "kafka-2:9093"],
                    "Topic": "netflow",
                    "TLS": {
                        "Enabled": true,
                        "CertFilePath": "/etc/certs/client.pem",
                        "KeyFilePath": "/etc/certs/client.key",
                        "CAFilePath": "/etc/certs/ca.pem"
                    }
                }
            },
            "ConfigV5Header": { "Version": true, "EngineID": false },
            "ConfigV5Record": { "TCPFlags": false, "DPkts": true }
        }"#;

        let config: CollectorConfig = serde_json::from_str(content).unwrap();
        assert_eq!(config.listen_address, "0.0.0.0:2055");
        assert_eq!(config.output.chunk_size, 500);
        assert_eq!(config.output.sink_queue_capacity, 16);
        assert_eq!(config.flow_queue_capacity, 1024);
        assert!(config.output.local_fs.enabled);
        assert_eq!(config.output.kafka.broker_list.len(), 2);
        assert_eq!(config.output.kafka.tls.ca_file_path, "/etc/certs/ca.pem");
        assert_eq!(config.output.kafka.message_timeout_ms, 5000);
        assert!(config.header_fields.version);
        assert!(!config.header_fields.engine_id);
        // 表存在时未列出的键关闭
        assert!(!config.header_fields.timestamp);
        assert!(config.record_fields.d_pkts);
        assert!(!config.record_fields.tcp_flags);
        assert!(!config.record_fields.src_addr);
        assert!(config.batch_sinks_enabled());
        assert!(config.bus_enabled());
    }

    #[test]
    fn test_missing_toggle_maps_default_to_enabled() {
        let content = r#"{ "ListenParams": ":2055", "Output": { "ChunkSize": 1 } }"#;
        let config: CollectorConfig = serde_json::from_str(content).unwrap();
        assert_eq!(config.header_fields, HeaderFields::all());
        assert_eq!(config.record_fields, RecordFields::all());
        assert!(!config.batch_sinks_enabled());
        assert!(!config.bus_enabled());
    }

    #[test]
    fn test_omitted_toggle_keys_are_disabled() {
        let content = r#"{
            "ListenParams": ":2055",
            "Output": { "ChunkSize": 1 },
            "ConfigV5Header": { "Count": true },
            "ConfigV5Record": {}
        }"#;
        let config: CollectorConfig = serde_json::from_str(content).unwrap();
        assert_eq!(
            config.header_fields,
            HeaderFields {
                count: true,
                ..HeaderFields::none()
            }
        );
        assert_eq!(config.record_fields, RecordFields::none());
    }

    #[test]
    fn test_validate_chunk_size_upper_bound() {
        let mut config: CollectorConfig = serde_json::from_str(
            r#"{ "ListenParams": ":2055", "Output": { "ChunkSize": 1 } }"#,
        )
        .unwrap();

        config.output.chunk_size = MAX_CHUNK_SIZE;
        assert!(config.validate().is_ok());

        config.output.chunk_size = MAX_CHUNK_SIZE + 1;
        assert!(config.validate().is_err());

        config.output.chunk_size = usize::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let content = r#"{ "ListenParams": ":2055", "Output": { "ChunkSize": 0 } }"#;
        let config: CollectorConfig = serde_json::from_str(content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_field_names() {
        let mut header = HeaderFields::all();
        header.engine_id = false;
        header.count = false;
        assert_eq!(header.disabled(), vec!["Count", "EngineID"]);

        assert_eq!(RecordFields::none().disabled().len(), 18);
        assert!(RecordFields::all().disabled().is_empty());
    }
}
