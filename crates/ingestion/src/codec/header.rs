//! v5 header decoding

use contracts::{Header, HeaderFields, HEADER_LENGTH};

use super::primitives::{be_u16, be_u32, take, timestamp};

/// 解析 24 字节头部
///
/// 只解析已启用的字段，未启用的字段保持零值。
/// 不校验 Version，也不校验报文总长度，由调用方负责。
pub fn decode_header(buf: &[u8; HEADER_LENGTH], fields: &HeaderFields) -> Header {
    let mut header = Header::default();

    if fields.version {
        header.version = be_u16(take(buf, 0));
    }
    if fields.count {
        header.count = be_u16(take(buf, 2));
    }
    if fields.sys_uptime {
        header.sys_uptime = be_u32(take(buf, 4));
    }
    if fields.timestamp {
        header.timestamp = timestamp(take(buf, 8), take(buf, 12));
    }
    if fields.flow_sequence {
        header.flow_sequence = be_u32(take(buf, 16));
    }
    if fields.engine_type {
        header.engine_type = buf[20];
    }
    if fields.engine_id {
        header.engine_id = buf[21];
    }
    if fields.sampling_interval {
        // mode 与 interval 不拆分，保留原始 16 位
        header.sampling_interval = be_u16(take(buf, 22));
    }

    header
}

/// Version as carried on the wire, independent of field toggles
pub fn raw_version(buf: &[u8; HEADER_LENGTH]) -> u16 {
    be_u16(take(buf, 0))
}

/// Declared record count as carried on the wire, independent of field toggles
pub fn raw_count(buf: &[u8; HEADER_LENGTH]) -> u16 {
    be_u16(take(buf, 2))
}
