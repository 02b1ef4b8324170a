//! Stress tests for scull devices.
//!
//! These drive a device under heavy load and concurrent access and report
//! throughput.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scull_core::{AccessMode, Handle, ScullDevice};

use crate::fixtures::pattern;

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total bytes moved by successful operations.
    pub bytes: u64,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, bytes: u64, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            bytes,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Bytes: {}", self.bytes);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Bytes offered per write call.
    pub chunk_size: usize,
    /// Offsets used by random operations fall below this bound.
    pub span: u64,
    /// Seed for the random offset generator.
    pub seed: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            chunk_size: 256,
            span: 1 << 20,
            seed: 0x5c11,
        }
    }
}

impl StressConfig {
    /// Returns the bytes each concurrent writer covers, or `None` if the
    /// product overflows.
    pub fn region_bytes(&self) -> Option<usize> {
        self.operations.checked_mul(self.chunk_size)
    }

    /// Returns the bytes all concurrent writers cover together, or `None` if
    /// the product overflows.
    pub fn total_bytes(&self) -> Option<usize> {
        self.region_bytes()?.checked_mul(self.threads)
    }
}

#[derive(Default)]
struct Tally {
    successful: AtomicUsize,
    failed: AtomicUsize,
    bytes: AtomicUsize,
}

impl Tally {
    fn record(&self, result: scull_core::CoreResult<usize>) {
        match result {
            Ok(n) => {
                self.successful.fetch_add(1, Ordering::Relaxed);
                self.bytes.fetch_add(n, Ordering::Relaxed);
            }
            Err(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn finish(&self, duration: Duration) -> StressTestResult {
        StressTestResult::new(
            self.successful.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.bytes.load(Ordering::Relaxed) as u64,
            duration,
        )
    }
}

/// Run a sequential write stress test, appending chunks from offset 0.
pub fn stress_sequential_writes(device: &Arc<ScullDevice>, config: &StressConfig) -> StressTestResult {
    let handle = open(device, AccessMode::ReadWrite);
    let tally = Tally::default();
    let data = pattern(0, config.chunk_size);

    let start = Instant::now();
    let mut offset = 0u64;
    for _ in 0..config.operations {
        tally.record(handle.write(&mut offset, &data));
    }
    tally.finish(start.elapsed())
}

/// Run a concurrent write stress test.
///
/// Each thread owns a disjoint region of `operations * chunk_size` bytes and
/// fills it with [`pattern`], so the final contents can be checked with
/// [`verify_pattern`].
///
/// # Panics
///
/// Panics if [`StressConfig::total_bytes`] overflows.
pub fn stress_concurrent_writers(
    device: &Arc<ScullDevice>,
    config: &StressConfig,
) -> StressTestResult {
    config
        .total_bytes()
        .expect("Stress regions overflow the address space");
    let tally = Arc::new(Tally::default());
    let barrier = Arc::new(Barrier::new(config.threads));
    let region = config.region_bytes().unwrap_or_default() as u64;

    let start = Instant::now();
    let workers: Vec<_> = (0..config.threads)
        .map(|t| {
            let device = Arc::clone(device);
            let tally = Arc::clone(&tally);
            let barrier = Arc::clone(&barrier);
            let chunk = config.chunk_size;
            thread::spawn(move || {
                let handle = open(&device, AccessMode::ReadWrite);
                let base = t as u64 * region;
                let data = pattern(base, region as usize);
                barrier.wait();

                let mut offset = base;
                let mut rest = &data[..];
                while !rest.is_empty() {
                    let take = rest.len().min(chunk);
                    let result = handle.write(&mut offset, &rest[..take]);
                    if let Ok(n) = result {
                        rest = &rest[n..];
                    } else {
                        rest = &rest[take..];
                        offset += take as u64;
                    }
                    tally.record(result);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("Stress worker panicked");
    }
    tally.finish(start.elapsed())
}

/// Run a mixed read/write stress test at random offsets.
///
/// Roughly one operation in three is a write.
pub fn stress_mixed_operations(
    device: &Arc<ScullDevice>,
    config: &StressConfig,
) -> StressTestResult {
    let tally = Arc::new(Tally::default());

    let start = Instant::now();
    let workers: Vec<_> = (0..config.threads)
        .map(|t| {
            let device = Arc::clone(device);
            let tally = Arc::clone(&tally);
            let config = config.clone();
            thread::spawn(move || {
                let handle = open(&device, AccessMode::ReadWrite);
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
                let mut buf = vec![0u8; config.chunk_size];

                for i in 0..config.operations {
                    let mut offset = rng.gen_range(0..config.span.max(1));
                    let result = if i % 3 == 0 {
                        let data = pattern(offset, config.chunk_size);
                        handle.write(&mut offset, &data)
                    } else {
                        handle.read(&mut offset, &mut buf)
                    };
                    tally.record(result);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("Stress worker panicked");
    }
    tally.finish(start.elapsed())
}

/// Returns the number of bytes in `offset..offset + len` that differ from
/// [`pattern`]. Holes count as mismatches.
pub fn verify_pattern(device: &Arc<ScullDevice>, offset: u64, len: usize) -> usize {
    let handle = open(device, AccessMode::ReadOnly);
    let expected = pattern(offset, len);
    let mut buf = vec![0u8; len];
    let mut at = offset;
    let mut filled = 0;

    while filled < len {
        match handle.read(&mut at, &mut buf[filled..]) {
            Ok(0) | Err(_) => break,
            Ok(n) => filled += n,
        }
    }

    let wrong = buf[..filled]
        .iter()
        .zip(&expected)
        .filter(|(got, want)| got != want)
        .count();
    wrong + (len - filled)
}

fn open(device: &Arc<ScullDevice>, mode: AccessMode) -> Handle {
    device
        .open(mode)
        .expect("Failed to open device for stress test")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestDevice;

    fn small() -> StressConfig {
        StressConfig {
            operations: 200,
            threads: 4,
            chunk_size: 48,
            span: 8 * 1024,
            seed: 7,
        }
    }

    #[test]
    fn sequential_writes_advance_by_quantum() {
        let dev = TestDevice::with_geometry(32, 4);
        let config = small();
        let result = stress_sequential_writes(&dev, &config);

        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.total_ops, config.operations);
        // Each call writes at most to the end of the current quantum.
        assert_eq!(dev.size(), result.bytes);
        assert!(result.bytes < (config.operations * config.chunk_size) as u64);
    }

    #[test]
    fn concurrent_writers_leave_every_region_intact() {
        let dev = TestDevice::with_geometry(32, 4);
        let config = small();
        let result = stress_concurrent_writers(&dev, &config);

        let total = config.total_bytes().unwrap();
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.bytes, total as u64);
        assert_eq!(dev.size(), total as u64);
        assert_eq!(verify_pattern(&dev, 0, total), 0);
    }

    #[test]
    fn mixed_operations_never_fail_without_a_limit() {
        let dev = TestDevice::with_geometry(64, 8);
        let config = small();
        let result = stress_mixed_operations(&dev, &config);

        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.total_ops, config.threads * config.operations);
        assert!(dev.size() <= config.span + config.chunk_size as u64);
    }

    #[test]
    fn verify_counts_holes_as_mismatches() {
        let dev = TestDevice::tiny();
        dev.fill(0, &pattern(0, 4));
        assert_eq!(verify_pattern(&dev, 0, 4), 0);
        assert_eq!(verify_pattern(&dev, 0, 12), 8);
    }

    #[test]
    fn byte_totals_are_checked() {
        let config = small();
        assert_eq!(config.region_bytes(), Some(200 * 48));
        assert_eq!(config.total_bytes(), Some(4 * 200 * 48));

        let huge = StressConfig {
            operations: usize::MAX / 2,
            chunk_size: 4,
            ..small()
        };
        assert_eq!(huge.region_bytes(), None);
        assert_eq!(huge.total_bytes(), None);

        let wide = StressConfig {
            operations: usize::MAX / 8,
            chunk_size: 2,
            threads: 8,
            ..small()
        };
        assert!(wide.region_bytes().is_some());
        assert_eq!(wide.total_bytes(), None);
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn concurrent_writers_reject_overflowing_regions() {
        let dev = TestDevice::tiny();
        let config = StressConfig {
            operations: usize::MAX,
            chunk_size: 2,
            ..small()
        };
        stress_concurrent_writers(&dev, &config);
    }

    #[test]
    fn result_computes_throughput() {
        let result = StressTestResult::new(90, 10, 1024, Duration::from_secs(2));
        assert_eq!(result.total_ops, 100);
        assert!((result.ops_per_second - 50.0).abs() < f64::EPSILON);
    }
}
