//! CANOPY - Store Metrics
//! Atomic counters for tracking store operations in a lock-free,
//! thread-safe manner using `AtomicU64`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Atomic operation counters for a canopy store.
///
/// All counters use `Ordering::Relaxed`; they are for observation only.
#[derive(Debug)]
pub struct StoreMetrics {
    /// Total number of set operations (TTL or not).
    pub sets: AtomicU64,
    /// Total number of get operations (including those behind `has`).
    pub gets: AtomicU64,
    /// Total number of delete operations.
    pub deletes: AtomicU64,
    /// Total number of tree reads and tree deletes.
    pub tree_scans: AtomicU64,
    /// Reads that found a value whose TTL had already passed.
    pub expired_reads: AtomicU64,
    /// Total number of committed batches.
    pub batch_writes: AtomicU64,
    /// Total number of completed expiration sweeps.
    pub sweeps: AtomicU64,
    /// Entries removed by sweeps.
    pub swept_keys: AtomicU64,
    /// Total bytes written (keys + envelopes).
    pub bytes_written: AtomicU64,
    /// Total bytes read (values returned by get).
    pub bytes_read: AtomicU64,
    /// Timestamp when the store was opened.
    started: Instant,
}

impl StoreMetrics {
    /// Create a new metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self {
            sets: AtomicU64::new(0),
            gets: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            tree_scans: AtomicU64::new(0),
            expired_reads: AtomicU64::new(0),
            batch_writes: AtomicU64::new(0),
            sweeps: AtomicU64::new(0),
            swept_keys: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Record a set and the bytes it wrote.
    pub fn record_set(&self, key_size: usize, envelope_size: usize) {
        self.sets.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add((key_size + envelope_size) as u64, Ordering::Relaxed);
    }

    /// Record a get; `None` for a miss.
    pub fn record_get(&self, value_size: Option<usize>) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        if let Some(size) = value_size {
            self.bytes_read.fetch_add(size as u64, Ordering::Relaxed);
        }
    }

    /// Record a read that hit an expired value.
    pub fn record_expired_read(&self) {
        self.expired_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delete.
    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tree read or tree delete.
    pub fn record_tree_scan(&self) {
        self.tree_scans.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed batch.
    pub fn record_batch_write(&self) {
        self.batch_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished sweep and how many entries it removed.
    pub fn record_sweep(&self, removed: usize) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.swept_keys.fetch_add(removed as u64, Ordering::Relaxed);
    }

    /// Get store uptime in seconds.
    pub fn uptime_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Get total number of request operations.
    pub fn total_ops(&self) -> u64 {
        self.sets.load(Ordering::Relaxed)
            + self.gets.load(Ordering::Relaxed)
            + self.deletes.load(Ordering::Relaxed)
            + self.tree_scans.load(Ordering::Relaxed)
            + self.batch_writes.load(Ordering::Relaxed)
    }

    /// Format metrics as a human-readable report.
    pub fn report(&self) -> String {
        format!(
            "\n═══ CANOPY Store Metrics ═══\n\
             Operations:\n\
               sets:          {}\n\
               gets:          {}\n\
               deletes:       {}\n\
               tree scans:    {}\n\
               batch writes:  {}\n\
             Expiry:\n\
               expired reads: {}\n\
               sweeps:        {}\n\
               swept keys:    {}\n\
             I/O:\n\
               written:       {} bytes\n\
               read:          {} bytes\n\
             Uptime: {:.2}s",
            self.sets.load(Ordering::Relaxed),
            self.gets.load(Ordering::Relaxed),
            self.deletes.load(Ordering::Relaxed),
            self.tree_scans.load(Ordering::Relaxed),
            self.batch_writes.load(Ordering::Relaxed),
            self.expired_reads.load(Ordering::Relaxed),
            self.sweeps.load(Ordering::Relaxed),
            self.swept_keys.load(Ordering::Relaxed),
            self.bytes_written.load(Ordering::Relaxed),
            self.bytes_read.load(Ordering::Relaxed),
            self.uptime_secs(),
        )
    }
}

impl Default for StoreMetrics {
    fn default() -> Self {
        Self::new()
    }
}
