//! # Scull Storage
//!
//! The sparse segment chain behind a scull device.
//!
//! This crate provides the lowest-level pieces of the store: the geometry
//! that maps a logical byte offset to a `(segment, slot, byte)` position, and
//! the lazily allocated chain of quantum sets that holds the bytes. It knows
//! nothing about locking, handles or access modes; `scull_core` wraps it.
//!
//! ## Design Principles
//!
//! - Offset resolution is pure arithmetic with no failure path
//! - Segments are allocated strictly in chain order, on first use
//! - Every allocation is charged to a [`MemoryBudget`] first; exceeding its
//!   limit is reported as [`StorageError::OutOfMemory`]. Slot tables and
//!   quanta also report a failed heap reservation that way, while segment
//!   headers are small fixed-size boxes and rely on the budget alone
//! - Holes are addressable but unallocated; lookups return `None` for them
//!
//! ## Example
//!
//! ```rust
//! use scull_storage::{Geometry, SegmentChain};
//!
//! let geometry = Geometry::new(4, 2).unwrap();
//! let mut chain = SegmentChain::new(geometry);
//!
//! let position = geometry.resolve(5);
//! chain.quantum_mut(position).unwrap()[position.byte] = b'x';
//!
//! assert_eq!(chain.quantum(position).unwrap()[1], b'x');
//! assert!(chain.quantum(geometry.resolve(0)).is_none());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod budget;
mod chain;
mod error;
mod geometry;

pub use budget::MemoryBudget;
pub use chain::{Quantum, Released, Segment, SegmentChain, Segments};
pub use error::{Allocation, StorageError, StorageResult};
pub use geometry::{Geometry, Position, DEFAULT_QSET_SIZE, DEFAULT_QUANTUM_SIZE};
