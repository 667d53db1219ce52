//! Listener configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::{CollectorConfig, HeaderFields, RecordFields};

/// Listener configuration
///
/// Derived once from `CollectorConfig` at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Bind address (`host:port`, empty host already expanded)
    pub bind_address: String,

    /// Upper bound on concurrently running decode tasks; `None` = unbounded
    pub max_in_flight_decodes: Option<usize>,

    /// Header fields to decode
    pub header_fields: HeaderFields,

    /// Record fields to decode
    pub record_fields: RecordFields,
}

impl ListenerConfig {
    /// Build from the process configuration
    pub fn from_collector(config: &CollectorConfig) -> Self {
        Self {
            bind_address: config.bind_address(),
            max_in_flight_decodes: config.max_in_flight_decodes,
            header_fields: config.header_fields,
            record_fields: config.record_fields,
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:2055".to_string(),
            max_in_flight_decodes: None,
            header_fields: HeaderFields::all(),
            record_fields: RecordFields::all(),
        }
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total datagrams received
    pub datagrams_received: AtomicU64,

    /// Datagrams dropped before decoding (too short, wrong version)
    pub datagrams_dropped: AtomicU64,

    /// Flows decoded and handed to the fan-out
    pub flows_decoded: AtomicU64,

    /// Datagrams whose declared count exceeded the payload
    pub truncated: AtomicU64,

    /// Decode tasks that failed unexpectedly
    pub task_failures: AtomicU64,

    /// Socket receive errors
    pub receive_errors: AtomicU64,

    /// Decode tasks currently running
    pub in_flight: AtomicUsize,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.datagrams_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decoded(&self) {
        self.flows_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_truncated(&self) {
        self.truncated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_failure(&self) {
        self.task_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn task_started(&self) {
        let in_flight = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        observability::metrics::record_decodes_in_flight(in_flight);
    }

    pub(crate) fn task_finished(&self) {
        let in_flight = self.in_flight.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        observability::metrics::record_decodes_in_flight(in_flight);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            datagrams_dropped: self.datagrams_dropped.load(Ordering::Relaxed),
            flows_decoded: self.flows_decoded.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            task_failures: self.task_failures.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub datagrams_dropped: u64,
    pub flows_decoded: u64,
    pub truncated: u64,
    pub task_failures: u64,
    pub receive_errors: u64,
    pub in_flight: usize,
}
