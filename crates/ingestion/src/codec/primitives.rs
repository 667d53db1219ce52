//! Big-endian field readers
//!
//! Fields are assembled byte by byte so nothing depends on buffer alignment or
//! host endianness.

use chrono::{DateTime, Utc};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Timestamp layout: fixed width, lexically sortable
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

#[inline]
pub fn be_u16(bytes: [u8; 2]) -> u16 {
    (u16::from(bytes[0]) << 8) | u16::from(bytes[1])
}

#[inline]
pub fn be_u32(bytes: [u8; 4]) -> u32 {
    (u32::from(bytes[0]) << 24)
        | (u32::from(bytes[1]) << 16)
        | (u32::from(bytes[2]) << 8)
        | u32::from(bytes[3])
}

/// Dotted-decimal rendering of a 32-bit address
pub fn ipv4(bytes: [u8; 4]) -> String {
    format!("{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
}

/// Render `unix_secs` + `unix_nsecs` as `YYYY-MM-DD HH:MM:SS.nnnnnnnnn` (UTC)
///
/// Nanoseconds of a second or more carry into the seconds part.
pub fn timestamp(secs: [u8; 4], nsecs: [u8; 4]) -> String {
    let secs = be_u32(secs);
    let nsecs = be_u32(nsecs);

    let total_secs = i64::from(secs) + i64::from(nsecs / NANOS_PER_SEC);
    let instant = DateTime::<Utc>::from_timestamp(total_secs, nsecs % NANOS_PER_SEC)
        .unwrap_or_default();
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Copy `N` bytes starting at `offset` out of a fixed-size slot
///
/// Offsets are compile-time constants inside the codec, so the range is always in bounds.
#[inline]
pub(crate) fn take<const N: usize, const L: usize>(slot: &[u8; L], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&slot[offset..offset + N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_be_u16() {
        assert_eq!(be_u16([0x00, 0x05]), 5);
        assert_eq!(be_u16([0x12, 0x34]), 0x1234);
        assert_eq!(be_u16([0xFF, 0xFF]), u16::MAX);
    }

    #[test]
    fn test_be_u32() {
        assert_eq!(be_u32([0x00, 0x00, 0x00, 0x01]), 1);
        assert_eq!(be_u32([0xDE, 0xAD, 0xBE, 0xEF]), 0xDEAD_BEEF);
    }

    #[test]
    fn test_ipv4() {
        assert_eq!(ipv4([192, 168, 1, 254]), "192.168.1.254");
        assert_eq!(ipv4([0, 0, 0, 0]), "0.0.0.0");
        assert_eq!(ipv4([255, 255, 255, 255]), "255.255.255.255");
    }

    #[test]
    fn test_timestamp_epoch() {
        assert_eq!(timestamp([0; 4], [0; 4]), "1970-01-01 00:00:00.000000000");
    }

    #[test]
    fn test_timestamp_with_nanos() {
        // 2021-01-01 00:00:00 UTC = 1609459200 = 0x5FEE6600
        let secs = 1_609_459_200u32.to_be_bytes();
        let nsecs = 123_456_789u32.to_be_bytes();
        assert_eq!(timestamp(secs, nsecs), "2021-01-01 00:00:00.123456789");
    }

    #[test]
    fn test_timestamp_nanos_overflow_carries() {
        let nsecs = 1_500_000_000u32.to_be_bytes();
        assert_eq!(timestamp([0; 4], nsecs), "1970-01-01 00:00:01.500000000");
    }

    #[test]
    fn test_timestamp_max_seconds() {
        let rendered = timestamp([0xFF; 4], [0xFF; 4]);
        assert!(rendered.starts_with("2106-02-07"), "got: {rendered}");
        assert_eq!(rendered.len(), "YYYY-MM-DD HH:MM:SS.nnnnnnnnn".len());
    }
}
