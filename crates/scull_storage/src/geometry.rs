//! Chain geometry and offset resolution.
//!
//! A chain is addressed as a flat byte space. Every segment covers
//! `item_size = quantum_size * qset_size` bytes, so a logical offset maps to
//! exactly one `(segment, slot, byte)` triple.

use crate::error::{StorageError, StorageResult};

/// Default size of a single quantum in bytes.
pub const DEFAULT_QUANTUM_SIZE: usize = 400;

/// Default number of quantum slots per segment.
pub const DEFAULT_QSET_SIZE: usize = 100;

/// The shape of a segment chain: how large each quantum is and how many
/// quanta a segment holds.
///
/// Both sizes are always positive and `quantum_size * qset_size` always fits
/// in a `u64`; [`Geometry::new`] is the only way to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    quantum_size: usize,
    qset_size: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            quantum_size: DEFAULT_QUANTUM_SIZE,
            qset_size: DEFAULT_QSET_SIZE,
        }
    }
}

impl Geometry {
    /// Creates a geometry after validating both sizes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidGeometry`] if either size is zero or
    /// the per-segment byte span does not fit in a `u64`.
    pub fn new(quantum_size: usize, qset_size: usize) -> StorageResult<Self> {
        let invalid = StorageError::InvalidGeometry {
            quantum_size,
            qset_size,
        };
        if quantum_size == 0 || qset_size == 0 {
            return Err(invalid);
        }
        (quantum_size as u64)
            .checked_mul(qset_size as u64)
            .ok_or(invalid)?;
        Ok(Self {
            quantum_size,
            qset_size,
        })
    }

    /// Returns the size of one quantum in bytes.
    #[must_use]
    pub const fn quantum_size(&self) -> usize {
        self.quantum_size
    }

    /// Returns the number of quantum slots per segment.
    #[must_use]
    pub const fn qset_size(&self) -> usize {
        self.qset_size
    }

    /// Returns the number of bytes addressed by one segment.
    #[must_use]
    pub const fn item_size(&self) -> u64 {
        self.quantum_size as u64 * self.qset_size as u64
    }

    /// Maps a logical byte offset to its position in the chain.
    #[must_use]
    pub const fn resolve(&self, offset: u64) -> Position {
        let item_size = self.item_size();
        let quantum = self.quantum_size as u64;
        let remainder = offset % item_size;
        Position {
            segment: offset / item_size,
            slot: (remainder / quantum) as usize,
            byte: (remainder % quantum) as usize,
        }
    }

    /// Maps a position back to its logical byte offset.
    ///
    /// Inverse of [`Geometry::resolve`] for positions it produced. Returns
    /// `None` if the offset does not fit in a `u64`.
    #[must_use]
    pub fn offset_of(&self, position: Position) -> Option<u64> {
        let within = position.slot as u64 * self.quantum_size as u64 + position.byte as u64;
        position
            .segment
            .checked_mul(self.item_size())?
            .checked_add(within)
    }
}

/// The location of a single byte in a segment chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Index of the segment in the chain.
    pub segment: u64,
    /// Index of the quantum slot within the segment.
    pub slot: usize,
    /// Byte offset within the quantum.
    pub byte: usize,
}

impl Position {
    /// Returns how many bytes remain in the addressed quantum, counting the
    /// addressed byte itself.
    #[must_use]
    pub const fn room(&self, geometry: &Geometry) -> usize {
        geometry.quantum_size - self.byte
    }
}
