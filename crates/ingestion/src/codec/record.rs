//! v5 flow record decoding

use contracts::{Record, RecordFields, RECORD_LENGTH};

use super::primitives::{be_u16, be_u32, ipv4, take};

/// 解析单个 48 字节记录
///
/// 偏移量相对于记录槽起始位置。字节 36 与 46-47 为填充位，不解析。
pub fn decode_record(slot: &[u8; RECORD_LENGTH], fields: &RecordFields) -> Record {
    let mut record = Record::default();

    if fields.src_addr {
        record.src_addr = ipv4(take(slot, 0));
    }
    if fields.dst_addr {
        record.dst_addr = ipv4(take(slot, 4));
    }
    if fields.next_hop {
        record.next_hop = ipv4(take(slot, 8));
    }
    if fields.input {
        record.input = be_u16(take(slot, 12));
    }
    if fields.output {
        record.output = be_u16(take(slot, 14));
    }
    if fields.d_pkts {
        record.d_pkts = be_u32(take(slot, 16));
    }
    if fields.d_octets {
        record.d_octets = be_u32(take(slot, 20));
    }
    if fields.first {
        record.first = be_u32(take(slot, 24));
    }
    if fields.last {
        record.last = be_u32(take(slot, 28));
    }
    if fields.src_port {
        record.src_port = be_u16(take(slot, 32));
    }
    if fields.dst_port {
        record.dst_port = be_u16(take(slot, 34));
    }
    if fields.tcp_flags {
        record.tcp_flags = slot[37];
    }
    if fields.prot {
        record.prot = slot[38];
    }
    if fields.tos {
        record.tos = slot[39];
    }
    if fields.src_as {
        record.src_as = be_u16(take(slot, 40));
    }
    if fields.dst_as {
        record.dst_as = be_u16(take(slot, 42));
    }
    if fields.src_mask {
        record.src_mask = slot[44];
    }
    if fields.dst_mask {
        record.dst_mask = slot[45];
    }

    record
}
