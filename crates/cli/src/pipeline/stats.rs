//! Pipeline statistics printed on shutdown.

use std::fmt;
use std::time::Duration;

use accumulator::AccumulatorStats;
use dispatcher::{BusSnapshot, MetricsSnapshot as SinkSnapshot};
use ingestion::MetricsSnapshot as IngestionSnapshot;

/// Statistics from a collector run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Listener and decode-task counters
    pub ingestion: IngestionSnapshot,

    /// Accumulator counters
    pub accumulator: AccumulatorStats,

    /// Per batch sink counters, in dispatch order
    pub sinks: Vec<(String, SinkSnapshot)>,

    /// Message-bus counters (None = bus disabled or did not drain)
    pub bus: Option<BusSnapshot>,

    /// Flows dropped at each fan-out queue because it was full
    pub fanout_dropped: Vec<(String, u64)>,
}

impl PipelineStats {
    /// Decoded flows per second over the whole run
    pub fn flows_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ingestion.flows_decoded as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received datagrams that were dropped, as percentage
    pub fn drop_rate(&self) -> f64 {
        let received = self.ingestion.datagrams_received;
        if received > 0 {
            (self.ingestion.datagrams_dropped as f64 / received as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("{self}");
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ingestion = &self.ingestion;
        writeln!(f)?;
        writeln!(f, "=== Collector Statistics ===")?;
        writeln!(f)?;
        writeln!(f, "Overview")?;
        writeln!(f, "  Duration: {:.2}s", self.duration.as_secs_f64())?;
        writeln!(f, "  Flows/s: {:.2}", self.flows_per_sec())?;

        writeln!(f, "\nIngestion")?;
        writeln!(f, "  Datagrams received: {}", ingestion.datagrams_received)?;
        writeln!(
            f,
            "  Datagrams dropped: {} ({:.2}%)",
            ingestion.datagrams_dropped,
            self.drop_rate()
        )?;
        writeln!(f, "  Flows decoded: {}", ingestion.flows_decoded)?;
        writeln!(f, "  Truncated datagrams: {}", ingestion.truncated)?;
        writeln!(f, "  Decode task failures: {}", ingestion.task_failures)?;
        writeln!(f, "  Receive errors: {}", ingestion.receive_errors)?;

        if !self.fanout_dropped.is_empty() {
            writeln!(f, "\nFlow queues")?;
            for (name, dropped) in &self.fanout_dropped {
                writeln!(f, "  {name}: dropped={dropped}")?;
            }
        }

        writeln!(f, "\nAccumulator")?;
        writeln!(f, "  Flows received: {}", self.accumulator.flows_received)?;
        writeln!(f, "  Batches emitted: {}", self.accumulator.batches_emitted)?;
        writeln!(f, "  Flows discarded at exit: {}", self.accumulator.flows_pending)?;

        if !self.sinks.is_empty() {
            writeln!(f, "\nBatch sinks")?;
            for (name, sink) in &self.sinks {
                writeln!(
                    f,
                    "  {name}: written={} bytes={} failed={} dropped={}",
                    sink.written, sink.bytes_written, sink.failed, sink.dropped
                )?;
            }
        }

        if let Some(bus) = &self.bus {
            writeln!(f, "\nKafka")?;
            writeln!(f, "  Published: {}", bus.published)?;
            writeln!(f, "  Failed: {}", bus.failed)?;
        }

        Ok(())
    }
}
