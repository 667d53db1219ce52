//! NetFlow v5 binary codec
//!
//! Pure functions, no I/O. Input slices are fixed-size arrays so the decoders are
//! total: the length invariant is enforced once by the caller when it slices the
//! datagram.

mod header;
mod primitives;
mod record;

pub use header::{decode_header, raw_count, raw_version};
pub use primitives::{be_u16, be_u32, ipv4, timestamp, TIMESTAMP_FORMAT};
pub use record::decode_record;
