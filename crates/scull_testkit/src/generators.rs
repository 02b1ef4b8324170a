//! Property-based test generators using proptest.
//!
//! Provides strategies for geometries, offsets and write batches that stay
//! small enough to keep chains short.

use proptest::prelude::*;
use scull_storage::Geometry;

/// Strategy for generating valid geometries with small quanta.
pub fn geometry_strategy() -> impl Strategy<Value = Geometry> {
    (1usize..64, 1usize..16)
        .prop_map(|(quantum, qset)| Geometry::new(quantum, qset).expect("Invalid geometry"))
}

/// Strategy for generating offsets within the first `segments` segments of
/// `geometry`.
pub fn offset_strategy(geometry: Geometry, segments: u64) -> impl Strategy<Value = u64> {
    0..geometry.item_size() * segments.max(1)
}

/// A single write in a generated batch.
#[derive(Debug, Clone)]
pub struct WriteOp {
    /// Device offset of the first byte.
    pub offset: u64,
    /// Payload.
    pub data: Vec<u8>,
}

impl WriteOp {
    /// Returns the offset one past the last byte.
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }
}

/// Strategy for generating a write with a payload of up to `max_len` bytes
/// at an offset below `max_offset`.
pub fn write_op_strategy(max_offset: u64, max_len: usize) -> impl Strategy<Value = WriteOp> {
    (
        0..max_offset.max(1),
        prop::collection::vec(any::<u8>(), 1..max_len.max(2)),
    )
        .prop_map(|(offset, data)| WriteOp { offset, data })
}

/// Strategy for generating a geometry together with a batch of writes that
/// spans a handful of segments.
pub fn write_batch_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = (Geometry, Vec<WriteOp>)> {
    geometry_strategy().prop_flat_map(move |geometry| {
        let max_offset = geometry.item_size() * 6;
        let max_len = geometry.quantum_size() * 3;
        (
            Just(geometry),
            prop::collection::vec(write_op_strategy(max_offset, max_len), min_ops..max_ops),
        )
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestDevice;
    use std::collections::BTreeMap;

    proptest! {
        #![proptest_config(PropTestConfig::default().to_proptest_config())]

        #[test]
        fn single_write_reads_back(
            (geometry, offset) in geometry_strategy()
                .prop_flat_map(|g| (Just(g), offset_strategy(g, 4))),
            seed in any::<u8>(),
        ) {
            let dev = TestDevice::with_geometry(geometry.quantum_size(), geometry.qset_size());
            let handle = dev.open();
            let room = geometry.resolve(offset).room(&geometry);
            let data: Vec<u8> = (0..room).map(|i| seed.wrapping_add(i as u8)).collect();

            let mut at = offset;
            prop_assert_eq!(handle.write(&mut at, &data).unwrap(), room);
            prop_assert_eq!(at, offset + room as u64);

            let mut at = offset;
            let mut buf = vec![0u8; room];
            prop_assert_eq!(handle.read(&mut at, &mut buf).unwrap(), room);
            prop_assert_eq!(buf, data);
        }

        #[test]
        fn writes_never_cross_a_quantum(
            (geometry, op) in geometry_strategy()
                .prop_flat_map(|g| (Just(g), write_op_strategy(g.item_size() * 3, 200))),
        ) {
            let dev = TestDevice::with_geometry(geometry.quantum_size(), geometry.qset_size());
            let handle = dev.open();

            let mut at = op.offset;
            let mut rest = &op.data[..];
            let mut calls = 0;
            while !rest.is_empty() {
                let room = geometry.resolve(at).room(&geometry);
                let n = handle.write(&mut at, rest).unwrap();
                prop_assert_eq!(n, room.min(rest.len()));
                rest = &rest[n..];
                calls += 1;
            }
            prop_assert!(calls >= 1);
            prop_assert_eq!(dev.size(), op.end());
        }

        #[test]
        fn batch_matches_model((geometry, ops) in write_batch_strategy(1, 12)) {
            let dev = TestDevice::with_geometry(geometry.quantum_size(), geometry.qset_size());
            let handle = dev.open();
            let mut model = BTreeMap::new();
            let mut expected_size = 0;

            for op in &ops {
                handle.write_all(&mut { op.offset }, &op.data).unwrap();
                for (i, byte) in op.data.iter().enumerate() {
                    model.insert(op.offset + i as u64, *byte);
                }
                expected_size = expected_size.max(op.end());
            }

            prop_assert_eq!(dev.size(), expected_size);
            for (&at, &byte) in &model {
                let mut buf = [0u8; 1];
                let n = handle.read(&mut { at }, &mut buf).unwrap();
                prop_assert_eq!(n, 1);
                prop_assert_eq!(buf[0], byte);
            }
        }
    }
}
