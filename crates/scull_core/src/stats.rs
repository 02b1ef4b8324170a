//! Device statistics.
//!
//! Counters are atomic and updated outside the device lock, so they can be
//! read while operations are in progress. All values only grow.

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for one device.
#[derive(Debug, Default)]
pub struct DeviceStats {
    opens: AtomicU64,
    releases: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    /// Reads that landed in an unallocated quantum.
    holes: AtomicU64,
    trims: AtomicU64,
    /// Lock waits abandoned through cancellation.
    interrupted: AtomicU64,
    errors: AtomicU64,
}

impl DeviceStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_open(&self) {
        self.opens.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read(&self, bytes: u64) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self, bytes: u64) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_hole(&self) {
        self.holes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_trim(&self) {
        self.trims.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_interrupted(&self) {
        self.interrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of handles opened.
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::Relaxed)
    }

    /// Returns the number of handles released.
    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }

    /// Returns the number of successful read calls.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of successful write calls.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the total bytes copied out by reads.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Returns the total bytes copied in by writes.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns the number of reads that hit a hole.
    pub fn holes(&self) -> u64 {
        self.holes.load(Ordering::Relaxed)
    }

    /// Returns the number of trims, including truncate-on-open.
    pub fn trims(&self) -> u64 {
        self.trims.load(Ordering::Relaxed)
    }

    /// Returns the number of interrupted lock waits.
    pub fn interrupted(&self) -> u64 {
        self.interrupted.load(Ordering::Relaxed)
    }

    /// Returns the number of failed operations.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            opens: self.opens(),
            releases: self.releases(),
            reads: self.reads(),
            writes: self.writes(),
            bytes_read: self.bytes_read(),
            bytes_written: self.bytes_written(),
            holes: self.holes(),
            trims: self.trims(),
            interrupted: self.interrupted(),
            errors: self.errors(),
        }
    }
}

/// A point-in-time copy of [`DeviceStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Handles opened.
    pub opens: u64,
    /// Handles released.
    pub releases: u64,
    /// Successful read calls.
    pub reads: u64,
    /// Successful write calls.
    pub writes: u64,
    /// Bytes copied out by reads.
    pub bytes_read: u64,
    /// Bytes copied in by writes.
    pub bytes_written: u64,
    /// Reads that hit a hole.
    pub holes: u64,
    /// Trims performed.
    pub trims: u64,
    /// Interrupted lock waits.
    pub interrupted: u64,
    /// Failed operations.
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = DeviceStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_operations() {
        let stats = DeviceStats::new();

        stats.record_read(100);
        stats.record_read(50);
        stats.record_write(200);
        stats.record_hole();
        stats.record_trim();

        let snap = stats.snapshot();
        assert_eq!(snap.reads, 2);
        assert_eq!(snap.bytes_read, 150);
        assert_eq!(snap.writes, 1);
        assert_eq!(snap.bytes_written, 200);
        assert_eq!(snap.holes, 1);
        assert_eq!(snap.trims, 1);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(DeviceStats::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let s = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    s.record_write(4);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.writes(), 800);
        assert_eq!(stats.bytes_written(), 3200);
    }
}
