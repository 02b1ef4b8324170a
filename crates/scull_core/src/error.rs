//! Error types for scull core.

use crate::handle::AccessMode;
use scull_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in device operations.
///
/// Reaching the end of data or a hole is not an error; reads report those
/// as zero bytes copied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Chain storage error, including allocation failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The wait for the device lock was cancelled before it was acquired.
    /// No state was changed.
    #[error("interrupted while waiting for device access")]
    Interrupted,

    /// Copying to or from the caller's buffer failed.
    #[error("transfer fault at offset {offset} after {transferred} bytes")]
    TransferFault {
        /// The device offset the operation started at.
        offset: u64,
        /// Bytes moved before the fault.
        transferred: usize,
    },

    /// The handle's access mode does not permit the operation.
    #[error("{operation} not permitted on a {mode} handle")]
    AccessDenied {
        /// The handle's access mode.
        mode: AccessMode,
        /// The attempted operation.
        operation: &'static str,
    },

    /// Advancing the offset would overflow.
    #[error("offset {offset} overflows the device address space")]
    OffsetOverflow {
        /// The offending offset.
        offset: u64,
    },
}

impl CoreError {
    /// Returns true if this error is an allocation failure.
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::Storage(StorageError::OutOfMemory { .. }))
    }

    /// Returns true if the lock wait was cancelled.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scull_storage::Allocation;

    #[test]
    fn out_of_memory_is_classified() {
        let err: CoreError = StorageError::OutOfMemory {
            kind: Allocation::Quantum,
            bytes: 400,
        }
        .into();
        assert!(err.is_out_of_memory());
        assert!(!err.is_interrupted());
        assert!(!CoreError::Interrupted.is_out_of_memory());
    }

    #[test]
    fn access_denied_message() {
        let err = CoreError::AccessDenied {
            mode: AccessMode::WriteOnly,
            operation: "read",
        };
        assert_eq!(err.to_string(), "read not permitted on a write-only handle");
    }
}
