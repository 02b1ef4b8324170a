//! Stress command implementation.

use std::sync::Arc;

use scull_core::{DeviceConfig, ScullDevice};
use scull_testkit::{stress_concurrent_writers, verify_pattern, StressConfig};
use serde::Serialize;
use tracing::info;

use super::{emit, CommandError, DeviceReport, OutputFormat};

/// Outcome of a stress run.
#[derive(Debug, Serialize)]
pub struct StressReport {
    /// Writer threads.
    pub threads: usize,
    /// Write calls issued.
    pub total_ops: usize,
    /// Write calls that failed.
    pub failed_ops: usize,
    /// Bytes written.
    pub bytes: u64,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,
    /// Write calls per second.
    pub ops_per_second: f64,
    /// Bytes that did not read back as written.
    pub corrupted_bytes: usize,
    /// Device state after the run.
    pub device: DeviceReport,
}

/// Runs concurrent writers over disjoint regions of a fresh device and
/// checks every region afterwards.
pub fn stress(
    config: DeviceConfig,
    threads: usize,
    writes_per_thread: usize,
    chunk_size: usize,
) -> Result<StressReport, Box<dyn std::error::Error>> {
    let device = Arc::new(ScullDevice::new(config)?);
    let stress_config = StressConfig {
        operations: writes_per_thread,
        threads: threads.max(1),
        chunk_size: chunk_size.max(1),
        ..StressConfig::default()
    };

    let total = stress_config
        .total_bytes()
        .ok_or(CommandError::TooLarge {
            threads: stress_config.threads,
            writes_per_thread,
            chunk_size: stress_config.chunk_size,
        })?;

    info!(
        threads = stress_config.threads,
        writes_per_thread, "starting stress run"
    );
    let result = stress_concurrent_writers(&device, &stress_config);
    let corrupted_bytes = verify_pattern(&device, 0, total);

    Ok(StressReport {
        threads: stress_config.threads,
        total_ops: result.total_ops,
        failed_ops: result.failed_ops,
        bytes: result.bytes,
        duration_ms: result.duration.as_millis(),
        ops_per_second: result.ops_per_second,
        corrupted_bytes,
        device: device.snapshot().into(),
    })
}

/// Runs the stress command.
pub fn run(
    config: DeviceConfig,
    threads: usize,
    writes_per_thread: usize,
    chunk_size: usize,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = stress(config, threads, writes_per_thread, chunk_size)?;
    emit(&report, format, |r| {
        println!("Stress run ({} threads):", r.threads);
        println!("  Write calls:     {}", r.total_ops);
        println!("  Failed:          {}", r.failed_ops);
        println!("  Bytes:           {}", r.bytes);
        println!("  Duration:        {} ms", r.duration_ms);
        println!("  Throughput:      {:.2} ops/sec", r.ops_per_second);
        r.device.print();
    })?;

    if report.corrupted_bytes > 0 {
        return Err(CommandError::Corrupted(report.corrupted_bytes).into());
    }
    Ok(())
}
