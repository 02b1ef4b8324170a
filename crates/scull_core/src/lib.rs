//! # Scull Core
//!
//! A memory-resident, random-access byte device.
//!
//! This crate provides:
//! - [`ScullDevice`], a sparse segment chain plus its logical size behind one
//!   exclusive lock
//! - [`Handle`], the open/read/write/release surface callers attach with
//! - Truncate-on-open for [`AccessMode::WriteOnly`], performed under the lock
//! - Cancellable lock waits through [`CancelToken`]
//! - Fallible caller buffers through [`TransferSource`] and [`TransferSink`]
//!
//! A single read or write never crosses a quantum boundary; callers loop
//! (or use [`Handle::write_all`] and [`Handle::read_to_end`]).
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use scull_core::{AccessMode, DeviceConfig, ScullDevice};
//!
//! let device = Arc::new(ScullDevice::new(DeviceConfig::new().quantum_size(4).qset_size(2)).unwrap());
//! let handle = device.open(AccessMode::ReadWrite).unwrap();
//!
//! let mut offset = 0;
//! assert_eq!(handle.write(&mut offset, b"ABCDEF").unwrap(), 4);
//! assert_eq!(handle.write(&mut offset, b"EF").unwrap(), 2);
//!
//! let mut buf = [0u8; 10];
//! let mut offset = 0;
//! assert_eq!(handle.read(&mut offset, &mut buf).unwrap(), 4);
//! assert_eq!(&buf[..4], b"ABCD");
//! handle.release().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod config;
mod device;
mod error;
mod handle;
mod stats;
mod transfer;

pub use cancel::CancelToken;
pub use config::{DeviceConfig, SharedDefaults};
pub use device::{DeviceSnapshot, ScullDevice};
pub use error::{CoreError, CoreResult};
pub use handle::{AccessMode, Handle};
pub use stats::{DeviceStats, StatsSnapshot};
pub use transfer::{BufferFault, TransferSink, TransferSource};

// Re-export storage types used in the public API.
pub use scull_storage::{Allocation, Geometry, Position, StorageError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
