//! The segment chain: a lazily grown, singly linked list of quantum sets.
//!
//! Ownership is strictly forward. The chain owns the head segment, each
//! segment owns its slot table and the next segment, and each slot owns at
//! most one quantum. Nothing outside the chain holds a reference into it.
//!
//! ```text
//!  head ─► Segment 0 ──next──► Segment 1 ──next──► ∅
//!            │                   │
//!            ▼                   ▼ (no slot table yet)
//!          [Q][∅][Q]...          ∅
//! ```

use std::mem;

use crate::budget::MemoryBudget;
use crate::error::{Allocation, StorageError, StorageResult};
use crate::geometry::{Geometry, Position};

/// A fixed-size, zero-initialised block of bytes.
#[derive(Debug)]
pub struct Quantum {
    data: Box<[u8]>,
}

impl Quantum {
    fn allocate(size: usize, budget: &mut MemoryBudget) -> StorageResult<Self> {
        budget.charge(Allocation::Quantum, size)?;
        let mut data = Vec::new();
        if data.try_reserve_exact(size).is_err() {
            budget.refund(size);
            return Err(StorageError::OutOfMemory {
                kind: Allocation::Quantum,
                bytes: size,
            });
        }
        data.resize(size, 0);
        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    /// Returns the quantum's bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the quantum's bytes for writing.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns the quantum length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the quantum holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

type SlotTable = Box<[Option<Quantum>]>;

const SLOT_BYTES: usize = mem::size_of::<Option<Quantum>>();

/// One node of the chain (a "quantum set").
///
/// The slot table is allocated on the first write that lands in this
/// segment, so a segment that was only walked through has none.
#[derive(Debug, Default)]
pub struct Segment {
    slots: Option<SlotTable>,
    next: Option<Box<Segment>>,
}

impl Segment {
    const HEADER_BYTES: usize = mem::size_of::<Segment>();

    /// Only the budget can refuse a header; the box itself is allocated
    /// infallibly.
    fn allocate(budget: &mut MemoryBudget) -> StorageResult<Box<Self>> {
        budget.charge(Allocation::Segment, Self::HEADER_BYTES)?;
        Ok(Box::default())
    }

    /// Returns true if the slot table has been allocated.
    #[must_use]
    pub fn has_slots(&self) -> bool {
        self.slots.is_some()
    }

    /// Returns the quantum in `slot`, or `None` if it is a hole.
    #[must_use]
    pub fn quantum(&self, slot: usize) -> Option<&Quantum> {
        self.slots.as_deref()?.get(slot)?.as_ref()
    }

    /// Returns the number of allocated quanta in this segment.
    #[must_use]
    pub fn quantum_count(&self) -> usize {
        self.slots
            .as_deref()
            .map_or(0, |slots| slots.iter().filter(|slot| slot.is_some()).count())
    }

    fn slots_or_allocate(
        &mut self,
        qset_size: usize,
        budget: &mut MemoryBudget,
    ) -> StorageResult<&mut [Option<Quantum>]> {
        match self.slots {
            Some(ref mut slots) => Ok(&mut slots[..]),
            None => {
                let table = allocate_slot_table(qset_size, budget)?;
                Ok(&mut self.slots.insert(table)[..])
            }
        }
    }
}

fn allocate_slot_table(qset_size: usize, budget: &mut MemoryBudget) -> StorageResult<SlotTable> {
    let bytes = qset_size.saturating_mul(SLOT_BYTES);
    budget.charge(Allocation::SlotTable, bytes)?;
    let mut slots = Vec::new();
    if slots.try_reserve_exact(qset_size).is_err() {
        budget.refund(bytes);
        return Err(StorageError::OutOfMemory {
            kind: Allocation::SlotTable,
            bytes,
        });
    }
    slots.resize_with(qset_size, || None);
    Ok(slots.into_boxed_slice())
}

/// Walks `index` links forward from `link`, linking a fresh segment wherever
/// the chain ends early.
///
/// Segments are linked one at a time in index order. If an allocation fails
/// the walk stops; everything linked before the failure stays in place.
fn follow_link<'a>(
    mut link: &'a mut Option<Box<Segment>>,
    budget: &mut MemoryBudget,
    index: u64,
) -> StorageResult<&'a mut Segment> {
    let mut remaining = index;
    loop {
        let segment: &mut Segment = match link {
            Some(segment) => segment,
            None => link.insert(Segment::allocate(budget)?),
        };
        if remaining == 0 {
            return Ok(segment);
        }
        remaining -= 1;
        link = &mut segment.next;
    }
}

/// What a [`SegmentChain::clear`] freed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Released {
    /// Segments freed.
    pub segments: usize,
    /// Quanta freed.
    pub quanta: usize,
    /// Bytes returned to the budget.
    pub bytes: usize,
}

/// The full sequence of segments backing one device.
#[derive(Debug)]
pub struct SegmentChain {
    head: Option<Box<Segment>>,
    geometry: Geometry,
    budget: MemoryBudget,
}

impl SegmentChain {
    /// Creates an empty chain with an unbounded budget.
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self::with_budget(geometry, MemoryBudget::unbounded())
    }

    /// Creates an empty chain that allocates against `budget`.
    #[must_use]
    pub fn with_budget(geometry: Geometry, budget: MemoryBudget) -> Self {
        Self {
            head: None,
            geometry,
            budget,
        }
    }

    /// Returns the geometry the chain was built with.
    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Returns the chain's allocation budget.
    #[must_use]
    pub const fn budget(&self) -> &MemoryBudget {
        &self.budget
    }

    /// Returns true if no segment has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns an iterator over the segments in chain order.
    pub fn segments(&self) -> Segments<'_> {
        Segments {
            next: self.head.as_deref(),
        }
    }

    /// Returns the segment at `index`, allocating it and every missing
    /// segment before it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OutOfMemory`] if a segment cannot be
    /// allocated. Segments linked before the failure remain valid.
    pub fn follow(&mut self, index: u64) -> StorageResult<&mut Segment> {
        follow_link(&mut self.head, &mut self.budget, index)
    }

    /// Returns the segment at `index` without allocating.
    #[must_use]
    pub fn find(&self, index: u64) -> Option<&Segment> {
        self.segments().nth(usize::try_from(index).ok()?)
    }

    /// Returns the bytes of the quantum at `position`, or `None` for a hole.
    #[must_use]
    pub fn quantum(&self, position: Position) -> Option<&[u8]> {
        self.find(position.segment)?
            .quantum(position.slot)
            .map(Quantum::as_bytes)
    }

    /// Returns the bytes of the quantum at `position`, allocating the
    /// segment, its slot table and the quantum as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SlotOutOfRange`] if the position does not
    /// belong to this chain's geometry, or [`StorageError::OutOfMemory`] if
    /// an allocation fails.
    pub fn quantum_mut(&mut self, position: Position) -> StorageResult<&mut [u8]> {
        let qset_size = self.geometry.qset_size();
        let quantum_size = self.geometry.quantum_size();
        if position.slot >= qset_size || position.byte >= quantum_size {
            return Err(StorageError::SlotOutOfRange {
                slot: position.slot,
                byte: position.byte,
            });
        }

        let segment = follow_link(&mut self.head, &mut self.budget, position.segment)?;
        let slots = segment.slots_or_allocate(qset_size, &mut self.budget)?;
        let slot = &mut slots[position.slot];
        let quantum = match slot {
            Some(quantum) => quantum,
            None => slot.insert(Quantum::allocate(quantum_size, &mut self.budget)?),
        };
        Ok(quantum.as_bytes_mut())
    }

    /// Returns the number of linked segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    /// Returns the number of allocated quanta across all segments.
    #[must_use]
    pub fn quantum_count(&self) -> usize {
        self.segments().map(Segment::quantum_count).sum()
    }

    /// Returns the bytes charged to the budget by this chain.
    #[must_use]
    pub const fn allocated_bytes(&self) -> usize {
        self.budget.used()
    }

    /// Frees every segment, slot table and quantum, then adopts `geometry`
    /// for future allocations.
    pub fn clear(&mut self, geometry: Geometry) -> Released {
        let released = self.release();
        self.geometry = geometry;
        released
    }

    fn release(&mut self) -> Released {
        let mut released = Released {
            bytes: self.budget.used(),
            ..Released::default()
        };
        let mut next = self.head.take();
        while let Some(mut segment) = next {
            next = segment.next.take();
            released.segments += 1;
            released.quanta += segment.quantum_count();
        }
        self.budget.reset();
        released
    }
}

impl Drop for SegmentChain {
    fn drop(&mut self) {
        // Unlink iteratively; the default recursive drop would grow the
        // stack with the chain length.
        self.release();
    }
}

/// Iterator over the segments of a chain.
#[derive(Debug)]
pub struct Segments<'a> {
    next: Option<&'a Segment>,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a Segment;

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.next?;
        self.next = segment.next.as_deref();
        Some(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Geometry {
        Geometry::new(4, 2).unwrap()
    }

    #[test]
    fn new_chain_is_empty() {
        let chain = SegmentChain::new(small());
        assert!(chain.is_empty());
        assert_eq!(chain.segment_count(), 0);
        assert_eq!(chain.quantum_count(), 0);
        assert_eq!(chain.allocated_bytes(), 0);
        assert!(chain.find(0).is_none());
    }

    #[test]
    fn follow_allocates_in_order() {
        let mut chain = SegmentChain::new(small());
        let segment = chain.follow(3).unwrap();
        assert!(!segment.has_slots());
        assert_eq!(chain.segment_count(), 4);
        assert_eq!(chain.quantum_count(), 0);

        chain.follow(1).unwrap();
        assert_eq!(chain.segment_count(), 4);
    }

    #[test]
    fn find_never_allocates() {
        let mut chain = SegmentChain::new(small());
        chain.follow(0).unwrap();
        assert!(chain.find(0).is_some());
        assert!(chain.find(5).is_none());
        assert_eq!(chain.segment_count(), 1);
    }

    #[test]
    fn quantum_mut_allocates_zeroed_block() {
        let geometry = small();
        let mut chain = SegmentChain::new(geometry);
        let position = geometry.resolve(13);

        let bytes = chain.quantum_mut(position).unwrap();
        assert_eq!(bytes, &[0, 0, 0, 0]);
        bytes[position.byte] = 7;

        assert_eq!(chain.segment_count(), 2);
        assert_eq!(chain.quantum_count(), 1);
        assert_eq!(chain.quantum(position).unwrap(), &[0, 7, 0, 0]);

        let quantum = chain.find(1).unwrap().quantum(1).unwrap();
        assert_eq!(quantum.len(), 4);
        assert!(!quantum.is_empty());
    }

    #[test]
    fn holes_read_as_none() {
        let geometry = small();
        let mut chain = SegmentChain::new(geometry);
        chain.quantum_mut(geometry.resolve(9)).unwrap();

        // Segment 0 was linked but has no slot table.
        assert!(chain.find(0).is_some());
        assert!(chain.quantum(geometry.resolve(0)).is_none());
        // Segment 1, slot 1 has no quantum.
        assert!(chain.quantum(geometry.resolve(12)).is_none());
        assert!(chain.quantum(geometry.resolve(8)).is_some());
    }

    #[test]
    fn out_of_range_position_is_rejected() {
        let mut chain = SegmentChain::new(small());
        let position = Position {
            segment: 0,
            slot: 2,
            byte: 0,
        };
        assert!(matches!(
            chain.quantum_mut(position),
            Err(StorageError::SlotOutOfRange { slot: 2, .. })
        ));
        assert!(chain.is_empty());
    }

    #[test]
    fn clear_frees_everything_and_adopts_geometry() {
        let geometry = small();
        let mut chain = SegmentChain::new(geometry);
        chain.quantum_mut(geometry.resolve(0)).unwrap();
        chain.quantum_mut(geometry.resolve(4)).unwrap();
        chain.quantum_mut(geometry.resolve(17)).unwrap();

        let next = Geometry::new(16, 8).unwrap();
        let released = chain.clear(next);

        assert_eq!(released.segments, 3);
        assert_eq!(released.quanta, 3);
        assert!(released.bytes > 0);
        assert!(chain.is_empty());
        assert_eq!(chain.allocated_bytes(), 0);
        assert_eq!(chain.geometry(), next);

        assert_eq!(chain.clear(next), Released::default());
    }

    #[test]
    fn budget_exhaustion_keeps_linked_prefix() {
        let geometry = small();
        let budget = MemoryBudget::limited(Segment::HEADER_BYTES * 2);
        let mut chain = SegmentChain::with_budget(geometry, budget);

        let err = chain.follow(4).unwrap_err();
        assert_eq!(
            err,
            StorageError::OutOfMemory {
                kind: Allocation::Segment,
                bytes: Segment::HEADER_BYTES,
            }
        );
        assert_eq!(chain.segment_count(), 2);
        assert!(chain.find(1).is_some());
        assert_eq!(chain.budget().limit(), Some(Segment::HEADER_BYTES * 2));
        assert_eq!(chain.budget().used(), Segment::HEADER_BYTES * 2);
    }

    #[test]
    fn quantum_allocation_failure_reports_quantum() {
        let geometry = small();
        let budget = MemoryBudget::limited(Segment::HEADER_BYTES + 2 * SLOT_BYTES);
        let mut chain = SegmentChain::with_budget(geometry, budget);

        let err = chain.quantum_mut(geometry.resolve(0)).unwrap_err();
        assert_eq!(
            err,
            StorageError::OutOfMemory {
                kind: Allocation::Quantum,
                bytes: 4,
            }
        );
        assert!(chain.find(0).unwrap().has_slots());
        assert_eq!(chain.quantum_count(), 0);
        assert_eq!(chain.allocated_bytes(), Segment::HEADER_BYTES + 2 * SLOT_BYTES);
    }

    #[test]
    fn long_chain_drops_without_recursion() {
        let mut chain = SegmentChain::new(Geometry::new(1, 1).unwrap());
        chain.follow(200_000).unwrap();
        assert_eq!(chain.segment_count(), 200_001);
        drop(chain);
    }
}
