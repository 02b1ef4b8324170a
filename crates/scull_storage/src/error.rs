//! Error types for chain storage operations.

use std::fmt;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The kind of object a failed allocation was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Allocation {
    /// A segment node.
    Segment,
    /// The slot table of a segment.
    SlotTable,
    /// A quantum data block.
    Quantum,
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Segment => "segment",
            Self::SlotTable => "slot table",
            Self::Quantum => "quantum",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while manipulating a segment chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The quantum or qset size is zero, or their product overflows.
    #[error("invalid geometry: quantum size {quantum_size}, qset size {qset_size}")]
    InvalidGeometry {
        /// The rejected quantum size.
        quantum_size: usize,
        /// The rejected qset size.
        qset_size: usize,
    },

    /// A position addressed a slot or byte outside the chain's geometry.
    #[error("position out of range: slot {slot}, byte {byte}")]
    SlotOutOfRange {
        /// The requested slot index.
        slot: usize,
        /// The requested byte within the quantum.
        byte: usize,
    },

    /// An allocation could not be satisfied.
    #[error("out of memory allocating {kind} ({bytes} bytes)")]
    OutOfMemory {
        /// What was being allocated.
        kind: Allocation,
        /// The size of the failed allocation in bytes.
        bytes: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_memory_message_names_the_allocation() {
        let err = StorageError::OutOfMemory {
            kind: Allocation::SlotTable,
            bytes: 800,
        };
        assert_eq!(err.to_string(), "out of memory allocating slot table (800 bytes)");
    }
}
