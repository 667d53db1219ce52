//! NetFlow v5 flow data structures
//!
//! Decoded form of one export datagram. Field names on the wire side follow the
//! Cisco v5 layout; JSON names are the ones downstream consumers already parse.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Header length in bytes
pub const HEADER_LENGTH: usize = 24;

/// Length of a single flow record in bytes
pub const RECORD_LENGTH: usize = 48;

/// Maximum number of records a v5 datagram may carry
pub const RECORD_MAX_COUNT: usize = 30;

/// Largest datagram the listener reads; longer payloads are truncated
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// The only export format version this collector decodes
pub const NETFLOW_V5_VERSION: u16 = 5;

/// One decoded NetFlow v5 transmission: a header and up to 30 records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetFlowV5 {
    #[serde(rename = "Header")]
    pub header: Header,

    #[serde(rename = "Records")]
    pub records: Vec<Record>,
}

/// v5 header (24 bytes)
///
/// Offsets are from the start of the datagram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// 00-01 export format version
    #[serde(rename = "Version")]
    pub version: u16,

    /// 02-03 number of flows in this packet (1-30)
    #[serde(rename = "Count")]
    pub count: u16,

    /// 04-07 milliseconds since the export device booted
    #[serde(rename = "sysUptime")]
    pub sys_uptime: u32,

    /// 08-15 unix_secs + unix_nsecs, rendered `YYYY-MM-DD HH:MM:SS.nnnnnnnnn`
    #[serde(rename = "Timestamp")]
    pub timestamp: String,

    /// 16-19 sequence counter of total flows seen
    #[serde(rename = "FlowSequence")]
    pub flow_sequence: u32,

    /// 20 type of flow-switching engine
    #[serde(rename = "EngineType")]
    pub engine_type: u8,

    /// 21 slot number of the flow-switching engine
    #[serde(rename = "EngineID")]
    pub engine_id: u8,

    /// 22-23 raw sampling field: 2 bits of mode, 14 bits of interval
    #[serde(rename = "SamplingInterval")]
    pub sampling_interval: u16,
}

impl Header {
    /// Sampling mode (top two bits of the raw field)
    pub fn sampling_mode(&self) -> u8 {
        (self.sampling_interval >> 14) as u8
    }

    /// Sampling interval value (low fourteen bits of the raw field)
    pub fn sampling_rate(&self) -> u16 {
        self.sampling_interval & 0x3FFF
    }
}

/// v5 flow record (48 bytes)
///
/// Offsets are relative to the start of the record slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// 00-03 source IP address
    #[serde(rename = "SrcAddr")]
    pub src_addr: String,

    /// 04-07 destination IP address
    #[serde(rename = "DstAddr")]
    pub dst_addr: String,

    /// 08-11 next hop router
    #[serde(rename = "NextHop")]
    pub next_hop: String,

    /// 12-13 SNMP index of input interface
    #[serde(rename = "Input")]
    pub input: u16,

    /// 14-15 SNMP index of output interface
    #[serde(rename = "Output")]
    pub output: u16,

    /// 16-19 packets in the flow
    #[serde(rename = "DPkts")]
    pub d_pkts: u32,

    /// 20-23 layer 3 bytes in the packets of the flow
    #[serde(rename = "DOctets")]
    pub d_octets: u32,

    /// 24-27 SysUptime at start of flow
    #[serde(rename = "First")]
    pub first: u32,

    /// 28-31 SysUptime when the last packet of the flow was received
    #[serde(rename = "Last")]
    pub last: u32,

    /// 32-33
    #[serde(rename = "SrcPort")]
    pub src_port: u16,

    /// 34-35
    #[serde(rename = "DstPort")]
    pub dst_port: u16,

    // 36 pad1
    /// 37 cumulative OR of TCP flags
    #[serde(rename = "TCPFlags")]
    pub tcp_flags: u8,

    /// 38 IP protocol (TCP = 6, UDP = 17)
    #[serde(rename = "Prot")]
    pub prot: u8,

    /// 39 type of service
    #[serde(rename = "Tos")]
    pub tos: u8,

    /// 40-41 source AS, origin or peer
    #[serde(rename = "SrcAs")]
    pub src_as: u16,

    /// 42-43 destination AS, origin or peer
    #[serde(rename = "DstAs")]
    pub dst_as: u16,

    /// 44 source prefix mask bits
    #[serde(rename = "SrcMask")]
    pub src_mask: u8,

    /// 45 destination prefix mask bits
    #[serde(rename = "DstMask")]
    pub dst_mask: u8,
    // 46-47 pad2
}

/// A flow in its transport-ready JSON form
///
/// Cheap to clone: every consumer of the fan-out gets the same allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedFlow(Arc<str>);

impl EncodedFlow {
    /// Serialize a decoded flow into its canonical field-tagged form
    pub fn encode(flow: &NetFlowV5) -> Result<Self, serde_json::Error> {
        serde_json::to_string(flow).map(Self::from)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EncodedFlow {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&str> for EncodedFlow {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl Deref for EncodedFlow {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncodedFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_split() {
        let header = Header {
            sampling_interval: 0b01_00000001100100,
            ..Default::default()
        };
        assert_eq!(header.sampling_mode(), 1);
        assert_eq!(header.sampling_rate(), 100);
    }

    #[test]
    fn test_encoded_flow_uses_wire_names() {
        let flow = NetFlowV5 {
            header: Header {
                version: 5,
                count: 1,
                ..Default::default()
            },
            records: vec![Record {
                src_addr: "10.0.0.1".into(),
                ..Default::default()
            }],
        };

        let encoded = EncodedFlow::encode(&flow).unwrap();
        let value: serde_json::Value = serde_json::from_str(encoded.as_str()).unwrap();
        assert_eq!(value["Header"]["Version"], 5);
        assert_eq!(value["Header"]["sysUptime"], 0);
        assert_eq!(value["Records"][0]["SrcAddr"], "10.0.0.1");
        assert_eq!(value["Records"][0]["TCPFlags"], 0);
    }

    #[test]
    fn test_encoded_flow_clone_shares_allocation() {
        let a = EncodedFlow::from("{}");
        let b = a.clone();
        assert!(std::ptr::eq(a.as_str(), b.as_str()));
    }
}
