//! Allocation accounting for a segment chain.

use crate::error::{Allocation, StorageError, StorageResult};

/// Tracks the bytes a chain has allocated, optionally against a hard limit.
///
/// Every segment header, slot table and quantum is charged before it is
/// allocated. A charge that would exceed the limit fails with
/// [`StorageError::OutOfMemory`] and leaves usage untouched.
#[derive(Debug, Clone, Default)]
pub struct MemoryBudget {
    limit: Option<usize>,
    used: usize,
}

impl MemoryBudget {
    /// Creates an unbounded budget.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            limit: None,
            used: 0,
        }
    }

    /// Creates a budget that refuses to grow beyond `limit` bytes.
    #[must_use]
    pub const fn limited(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            used: 0,
        }
    }

    /// Returns the configured limit, if any.
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns the number of bytes currently charged.
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    /// Charges `bytes` for an allocation of `kind`.
    pub(crate) fn charge(&mut self, kind: Allocation, bytes: usize) -> StorageResult<()> {
        let oom = StorageError::OutOfMemory { kind, bytes };
        let used = self.used.checked_add(bytes).ok_or(oom.clone())?;
        if self.limit.is_some_and(|limit| used > limit) {
            return Err(oom);
        }
        self.used = used;
        Ok(())
    }

    /// Returns a charge for an allocation that did not happen.
    pub(crate) fn refund(&mut self, bytes: usize) {
        self.used = self.used.saturating_sub(bytes);
    }

    /// Forgets all charges. Called when the whole chain is released.
    pub(crate) fn reset(&mut self) {
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_accepts_everything() {
        let mut budget = MemoryBudget::unbounded();
        budget.charge(Allocation::Quantum, usize::MAX / 2).unwrap();
        assert_eq!(budget.used(), usize::MAX / 2);
    }

    #[test]
    fn limited_rejects_overrun() {
        let mut budget = MemoryBudget::limited(100);
        budget.charge(Allocation::Quantum, 60).unwrap();

        let err = budget.charge(Allocation::Quantum, 60).unwrap_err();
        assert_eq!(
            err,
            StorageError::OutOfMemory {
                kind: Allocation::Quantum,
                bytes: 60
            }
        );
        assert_eq!(budget.used(), 60);

        budget.charge(Allocation::Segment, 40).unwrap();
        assert_eq!(budget.used(), 100);
    }

    #[test]
    fn refund_and_reset() {
        let mut budget = MemoryBudget::limited(100);
        budget.charge(Allocation::SlotTable, 80).unwrap();
        budget.refund(30);
        assert_eq!(budget.used(), 50);
        budget.reset();
        assert_eq!(budget.used(), 0);
        assert_eq!(budget.limit(), Some(100));
    }
}
