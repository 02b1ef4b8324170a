//! CLI command implementations.

pub mod load;
pub mod resolve;
pub mod stress;

use clap::ValueEnum;
use serde::Serialize;

/// How a command prints its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Failures specific to CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Data read back from the device differs from what was loaded.
    #[error("verification failed at offset {offset}: loaded {expected} bytes, read back {actual}")]
    VerificationFailed {
        /// First differing offset.
        offset: u64,
        /// Bytes loaded.
        expected: usize,
        /// Bytes read back.
        actual: usize,
    },

    /// The requested stress run covers more bytes than can be addressed.
    #[error("stress run too large: {threads} threads x {writes_per_thread} writes x {chunk_size} bytes")]
    TooLarge {
        /// Writer threads requested.
        threads: usize,
        /// Write calls per thread requested.
        writes_per_thread: usize,
        /// Bytes per write call requested.
        chunk_size: usize,
    },

    /// The stress run left bytes that do not match the written pattern.
    #[error("stress run corrupted {0} bytes")]
    Corrupted(usize),
}

/// Prints `report` as JSON, or through `text` otherwise.
pub fn emit<T: Serialize>(
    report: &T,
    format: OutputFormat,
    text: impl FnOnce(&T),
) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => text(report),
    }
    Ok(())
}

/// Device figures shared by command reports.
#[derive(Debug, Serialize)]
pub struct DeviceReport {
    /// Bytes of valid data.
    pub logical_size: u64,
    /// Bytes per quantum.
    pub quantum_size: usize,
    /// Slots per segment.
    pub qset_size: usize,
    /// Linked segments.
    pub segments: usize,
    /// Allocated quanta.
    pub quanta: usize,
    /// Bytes charged to the memory budget.
    pub allocated_bytes: usize,
}

impl From<scull_core::DeviceSnapshot> for DeviceReport {
    fn from(snapshot: scull_core::DeviceSnapshot) -> Self {
        Self {
            logical_size: snapshot.logical_size,
            quantum_size: snapshot.geometry.quantum_size(),
            qset_size: snapshot.geometry.qset_size(),
            segments: snapshot.segments,
            quanta: snapshot.quanta,
            allocated_bytes: snapshot.allocated_bytes,
        }
    }
}

impl DeviceReport {
    fn print(&self) {
        println!("Device:");
        println!("  Logical size:    {} bytes", self.logical_size);
        println!(
            "  Geometry:        {} x {} bytes",
            self.qset_size, self.quantum_size
        );
        println!("  Segments:        {}", self.segments);
        println!("  Quanta:          {}", self.quanta);
        println!("  Allocated:       {} bytes", self.allocated_bytes);
    }
}
