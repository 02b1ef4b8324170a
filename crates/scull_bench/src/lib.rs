//! Benchmark helpers shared by the scull benches.

#![warn(missing_docs)]

use std::sync::Arc;

use rand::Rng;
use scull_core::{AccessMode, DeviceConfig, ScullDevice};

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Create a device with the given geometry.
pub fn device(quantum_size: usize, qset_size: usize) -> Arc<ScullDevice> {
    Arc::new(
        ScullDevice::new(
            DeviceConfig::new()
                .quantum_size(quantum_size)
                .qset_size(qset_size),
        )
        .expect("Failed to create bench device"),
    )
}

/// Create a device with the given geometry already holding `len` bytes.
pub fn filled_device(quantum_size: usize, qset_size: usize, len: usize) -> Arc<ScullDevice> {
    let device = device(quantum_size, qset_size);
    let handle = device
        .open(AccessMode::WriteOnly)
        .expect("Failed to open bench device");
    handle
        .write_all(&mut 0, &random_data(len))
        .expect("Failed to fill bench device");
    device
}
