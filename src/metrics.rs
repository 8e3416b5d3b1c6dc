use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use parking_lot::Mutex;

/// Delivery metrics collector for the batching engine
#[derive(Debug)]
pub struct MetricsCollector {
    // Admission
    /// Number of records admitted into a shard
    enqueued_count: AtomicUsize,
    /// Number of enqueues rejected because every shard was full
    rejected_count: AtomicUsize,

    // Delivery
    /// Number of flush cycles run
    flush_count: AtomicUsize,
    /// Number of batches handed to the ingestion endpoint
    batch_count: AtomicUsize,
    /// Number of records acknowledged by the endpoint
    delivered_count: AtomicUsize,
    /// Number of records the endpoint reported as failed
    failed_count: AtomicUsize,
    /// Number of batches that could not be delivered at all
    transport_failure_count: AtomicUsize,

    // Timing
    /// Total flush duration in nanoseconds
    flush_duration_ns: AtomicU64,
    /// Last flush duration
    last_flush_duration: Mutex<Duration>,

    // Internal state
    /// Start time of the metrics collector
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            enqueued_count: AtomicUsize::new(0),
            rejected_count: AtomicUsize::new(0),

            flush_count: AtomicUsize::new(0),
            batch_count: AtomicUsize::new(0),
            delivered_count: AtomicUsize::new(0),
            failed_count: AtomicUsize::new(0),
            transport_failure_count: AtomicUsize::new(0),

            flush_duration_ns: AtomicU64::new(0),
            last_flush_duration: Mutex::new(Duration::from_secs(0)),

            start_time: Instant::now(),
        }
    }

    /// Increment admitted record count
    pub fn increment_enqueued(&self) {
        self.enqueued_count.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::increment_counter!("langfuse_records_enqueued_total");
    }

    /// Increment rejected enqueue count
    pub fn increment_rejected(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::increment_counter!("langfuse_records_rejected_total");
    }

    /// Increment flush cycle count
    pub fn increment_flushes(&self) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::increment_counter!("langfuse_flush_cycles_total");
    }

    /// Increment sent batch count
    pub fn increment_batches(&self) {
        self.batch_count.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::increment_counter!("langfuse_batches_sent_total");
    }

    /// Add acknowledged records
    pub fn add_delivered(&self, count: usize) {
        self.delivered_count.fetch_add(count, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("langfuse_records_delivered_total", count as u64);
    }

    /// Add records reported as failed by the endpoint
    pub fn add_failed(&self, count: usize) {
        self.failed_count.fetch_add(count, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("langfuse_records_failed_total", count as u64);
    }

    /// Increment undeliverable batch count
    pub fn increment_transport_failures(&self) {
        self.transport_failure_count.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::increment_counter!("langfuse_transport_failures_total");
    }

    /// Record a flush cycle duration
    pub fn record_flush_duration(&self, duration: Duration) {
        self.flush_duration_ns.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        *self.last_flush_duration.lock() = duration;
        #[cfg(feature = "metrics")]
        {
            metrics::counter!("langfuse_flush_duration_nanoseconds_total", duration.as_nanos() as u64);
            metrics::histogram!("langfuse_flush_duration_seconds", duration.as_secs_f64());
        }
    }

    /// Get number of admitted records
    pub fn get_enqueued_count(&self) -> usize {
        self.enqueued_count.load(Ordering::Relaxed)
    }

    /// Get number of rejected enqueues
    pub fn get_rejected_count(&self) -> usize {
        self.rejected_count.load(Ordering::Relaxed)
    }

    /// Get number of flush cycles
    pub fn get_flush_count(&self) -> usize {
        self.flush_count.load(Ordering::Relaxed)
    }

    /// Get number of sent batches
    pub fn get_batch_count(&self) -> usize {
        self.batch_count.load(Ordering::Relaxed)
    }

    /// Get number of acknowledged records
    pub fn get_delivered_count(&self) -> usize {
        self.delivered_count.load(Ordering::Relaxed)
    }

    /// Get number of records reported as failed
    pub fn get_failed_count(&self) -> usize {
        self.failed_count.load(Ordering::Relaxed)
    }

    /// Get number of undeliverable batches
    pub fn get_transport_failure_count(&self) -> usize {
        self.transport_failure_count.load(Ordering::Relaxed)
    }

    /// Get total flush duration
    pub fn get_flush_duration(&self) -> Duration {
        Duration::from_nanos(self.flush_duration_ns.load(Ordering::Relaxed))
    }

    /// Get last flush duration
    pub fn get_last_flush_duration(&self) -> Duration {
        *self.last_flush_duration.lock()
    }

    /// Get delivery success rate (0.0 - 1.0)
    pub fn get_delivery_rate(&self) -> f64 {
        let delivered = self.get_delivered_count();
        let failed = self.get_failed_count();

        if delivered + failed == 0 {
            return 0.0;
        }

        delivered as f64 / (delivered + failed) as f64
    }

    /// Get uptime of the metrics collector
    pub fn get_uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.enqueued_count.store(0, Ordering::Relaxed);
        self.rejected_count.store(0, Ordering::Relaxed);

        self.flush_count.store(0, Ordering::Relaxed);
        self.batch_count.store(0, Ordering::Relaxed);
        self.delivered_count.store(0, Ordering::Relaxed);
        self.failed_count.store(0, Ordering::Relaxed);
        self.transport_failure_count.store(0, Ordering::Relaxed);

        self.flush_duration_ns.store(0, Ordering::Relaxed);
        *self.last_flush_duration.lock() = Duration::from_secs(0);
    }

    /// Get a report of all metrics
    pub fn get_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Langfuse Batching Metrics ===\n\n");

        let uptime = self.get_uptime();
        report.push_str(&format!("Uptime: {:?}\n\n", uptime));

        report.push_str("Admission:\n");
        report.push_str(&format!("  Enqueued: {}\n", self.get_enqueued_count()));
        report.push_str(&format!("  Rejected (no capacity): {}\n\n", self.get_rejected_count()));

        report.push_str("Delivery:\n");
        report.push_str(&format!("  Flush Cycles: {}\n", self.get_flush_count()));
        report.push_str(&format!("  Batches Sent: {}\n", self.get_batch_count()));
        report.push_str(&format!("  Records Delivered: {}\n", self.get_delivered_count()));
        report.push_str(&format!("  Records Failed: {}\n", self.get_failed_count()));
        report.push_str(&format!("  Transport Failures: {}\n", self.get_transport_failure_count()));
        report.push_str(&format!("  Delivery Rate: {:.2}%\n\n", self.get_delivery_rate() * 100.0));

        report.push_str("Timing:\n");
        if self.get_flush_count() > 0 {
            let avg_flush = self.get_flush_duration().as_micros() / self.get_flush_count() as u128;
            report.push_str(&format!("  Avg. Flush Time: {}µs\n", avg_flush));
        }
        report.push_str(&format!("  Last Flush Time: {:?}\n", self.get_last_flush_duration()));

        report
    }
}
