//! Resolve command implementation.

use scull_core::DeviceConfig;
use scull_storage::Geometry;
use serde::Serialize;

use super::{emit, OutputFormat};

/// Where an offset lands in the segment chain.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ResolveResult {
    /// Requested offset.
    pub offset: u64,
    /// Segment index.
    pub segment: u64,
    /// Quantum slot within the segment.
    pub slot: usize,
    /// Byte within the quantum.
    pub byte: usize,
    /// Bytes a single call can move from this offset.
    pub room: usize,
}

/// Resolves `offset` under `geometry`.
pub fn resolve(geometry: &Geometry, offset: u64) -> ResolveResult {
    let position = geometry.resolve(offset);
    ResolveResult {
        offset,
        segment: position.segment,
        slot: position.slot,
        byte: position.byte,
        room: position.room(geometry),
    }
}

/// Runs the resolve command.
pub fn run(
    config: &DeviceConfig,
    offset: u64,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let geometry = config.geometry()?;
    let result = resolve(&geometry, offset);
    emit(&result, format, |r| {
        println!("Offset {}:", r.offset);
        println!("  Segment: {}", r.segment);
        println!("  Slot:    {}", r.slot);
        println!("  Byte:    {}", r.byte);
        println!("  Room:    {} bytes", r.room);
    })?;
    Ok(())
}
