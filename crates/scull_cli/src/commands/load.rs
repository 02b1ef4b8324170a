//! Load command implementation.

use std::path::Path;
use std::sync::Arc;

use scull_core::{AccessMode, CoreResult, DeviceConfig, ScullDevice};
use serde::Serialize;
use tracing::info;

use super::{emit, CommandError, DeviceReport, OutputFormat};

/// Outcome of loading a file into a device.
#[derive(Debug, Serialize)]
pub struct LoadResult {
    /// Bytes read from the file.
    pub file_bytes: usize,
    /// Write calls needed to store them.
    pub write_calls: u64,
    /// Read calls needed to fetch them back.
    pub read_calls: u64,
    /// Device state after the read-back.
    pub device: DeviceReport,
}

/// Stores `data` in `device` through a truncating handle, then reads it back
/// through a read-only one and checks the two agree.
pub fn load_bytes(
    device: &Arc<ScullDevice>,
    data: &[u8],
) -> Result<LoadResult, Box<dyn std::error::Error>> {
    let writer = device.open(AccessMode::WriteOnly)?;
    writer.write_all(&mut 0, data)?;
    writer.release()?;

    let reader = device.open(AccessMode::ReadOnly)?;
    let mut back = Vec::with_capacity(data.len());
    reader.read_to_end(&mut 0, &mut back)?;
    reader.release()?;

    if back != data {
        let offset = back
            .iter()
            .zip(data)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| back.len().min(data.len()));
        return Err(CommandError::VerificationFailed {
            offset: offset as u64,
            expected: data.len(),
            actual: back.len(),
        }
        .into());
    }

    let stats = device.stats();
    Ok(LoadResult {
        file_bytes: data.len(),
        write_calls: stats.writes(),
        read_calls: stats.reads(),
        device: device.snapshot().into(),
    })
}

fn device(config: DeviceConfig) -> CoreResult<Arc<ScullDevice>> {
    Ok(Arc::new(ScullDevice::new(config)?))
}

/// Runs the load command.
pub fn run(
    config: DeviceConfig,
    file: &Path,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(file)?;
    info!(path = %file.display(), bytes = data.len(), "loading file");

    let device = device(config)?;
    let result = load_bytes(&device, &data)?;
    emit(&result, format, |r| {
        println!("Loaded {:?}", file);
        println!("  File size:       {} bytes", r.file_bytes);
        println!("  Write calls:     {}", r.write_calls);
        println!("  Read calls:      {}", r.read_calls);
        r.device.print();
        println!();
        println!("✓ Read-back matches");
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tiny() -> DeviceConfig {
        DeviceConfig::new().quantum_size(4).qset_size(2)
    }

    #[test]
    fn load_counts_one_call_per_quantum() {
        let device = device(tiny()).unwrap();
        let result = load_bytes(&device, b"ABCDEFGHIJ").unwrap();

        assert_eq!(result.file_bytes, 10);
        assert_eq!(result.write_calls, 3);
        assert_eq!(result.read_calls, 3);
        assert_eq!(result.device.logical_size, 10);
        assert_eq!(result.device.segments, 2);
        assert_eq!(result.device.quanta, 3);
    }

    #[test]
    fn load_truncates_previous_contents() {
        let device = device(tiny()).unwrap();
        load_bytes(&device, b"a much longer first payload").unwrap();
        let result = load_bytes(&device, b"short").unwrap();
        assert_eq!(result.device.logical_size, 5);
    }

    #[test]
    fn load_fails_when_memory_runs_out() {
        let device = device(tiny().memory_limit(64)).unwrap();
        let err = load_bytes(&device, &[1u8; 1024]).unwrap_err();
        let core = err.downcast_ref::<scull_core::CoreError>().unwrap();
        assert!(core.is_out_of_memory());
    }

    #[test]
    fn run_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello scull").unwrap();
        file.flush().unwrap();

        run(tiny(), file.path(), OutputFormat::Json).unwrap();
    }

    #[test]
    fn run_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(tiny(), &dir.path().join("absent"), OutputFormat::Text).is_err());
    }
}
