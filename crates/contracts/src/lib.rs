//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data Flow
//! - `NetFlowV5` is decoded from one datagram and lives only until it is encoded
//! - `EncodedFlow` is what travels over the flow queues
//! - `Batch` is what the batch sinks receive

mod batch;
mod config;
mod error;
mod flow;
mod sink;

pub use batch::*;
pub use config::*;
pub use error::*;
pub use flow::*;
pub use sink::*;
