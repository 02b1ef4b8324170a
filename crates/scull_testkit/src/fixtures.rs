//! Test fixtures and device helpers.

use std::sync::Arc;
use std::time::Duration;

use scull_core::{
    AccessMode, BufferFault, DeviceConfig, Handle, ScullDevice, TransferSink, TransferSource,
};

/// A shared device with a small geometry, handy for exercising segment and
/// quantum boundaries without writing much data.
pub struct TestDevice {
    /// The device instance.
    pub device: Arc<ScullDevice>,
}

impl TestDevice {
    /// Creates a device with a 4-byte quantum and 2 slots per segment.
    pub fn tiny() -> Self {
        Self::with_geometry(4, 2)
    }

    /// Creates a device with the default 400 x 100 geometry.
    pub fn standard() -> Self {
        Self::with_config(DeviceConfig::default())
    }

    /// Creates a device with the given geometry.
    pub fn with_geometry(quantum_size: usize, qset_size: usize) -> Self {
        Self::with_config(
            DeviceConfig::new()
                .quantum_size(quantum_size)
                .qset_size(qset_size)
                .lock_poll_interval(Duration::from_millis(1)),
        )
    }

    /// Creates a device from a full configuration.
    pub fn with_config(config: DeviceConfig) -> Self {
        Self {
            device: Arc::new(ScullDevice::new(config).expect("Failed to create test device")),
        }
    }

    /// Opens a read-write handle.
    pub fn open(&self) -> Handle {
        self.device
            .open(AccessMode::ReadWrite)
            .expect("Failed to open test device")
    }

    /// Writes all of `data` at `offset`.
    pub fn fill(&self, offset: u64, data: &[u8]) {
        let handle = self.open();
        let mut offset = offset;
        handle
            .write_all(&mut offset, data)
            .expect("Failed to fill test device");
    }

    /// Reads from `offset` until end of data or a hole.
    pub fn contents_from(&self, offset: u64) -> Vec<u8> {
        let handle = self.open();
        let mut out = Vec::new();
        let mut offset = offset;
        handle
            .read_to_end(&mut offset, &mut out)
            .expect("Failed to read test device");
        out
    }
}

impl std::ops::Deref for TestDevice {
    type Target = Arc<ScullDevice>;

    fn deref(&self) -> &Self::Target {
        &self.device
    }
}

/// Returns `len` bytes of a repeating, position-dependent pattern.
///
/// Each byte depends on its absolute offset, so misplaced copies show up as
/// mismatches instead of matching by accident.
pub fn pattern(offset: u64, len: usize) -> Vec<u8> {
    (0..len as u64)
        .map(|i| {
            let at = offset + i;
            (at % 251) as u8 ^ (at / 251 % 256) as u8
        })
        .collect()
}

/// A caller buffer that fails after accepting or supplying `limit` bytes.
#[derive(Debug, Clone)]
pub struct FaultyBuffer {
    data: Vec<u8>,
    limit: usize,
}

impl FaultyBuffer {
    /// Creates a buffer holding `data` that faults past `limit` bytes.
    pub fn new(data: Vec<u8>, limit: usize) -> Self {
        Self { data, limit }
    }

    /// Creates an empty sink of `len` bytes that faults past `limit` bytes.
    pub fn sink(len: usize, limit: usize) -> Self {
        Self::new(vec![0; len], limit)
    }

    /// Returns the buffer contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl TransferSource for FaultyBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn copy_to(&self, dst: &mut [u8]) -> Result<(), BufferFault> {
        if dst.len() > self.limit {
            dst[..self.limit].copy_from_slice(&self.data[..self.limit]);
            return Err(BufferFault {
                transferred: self.limit,
            });
        }
        dst.copy_from_slice(&self.data[..dst.len()]);
        Ok(())
    }
}

impl TransferSink for FaultyBuffer {
    fn space(&self) -> usize {
        self.data.len()
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), BufferFault> {
        if src.len() > self.limit {
            self.data[..self.limit].copy_from_slice(&src[..self.limit]);
            return Err(BufferFault {
                transferred: self.limit,
            });
        }
        self.data[..src.len()].copy_from_slice(src);
        Ok(())
    }
}
