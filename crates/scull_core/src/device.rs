//! The device: one segment chain and its logical size behind one lock.
//!
//! Every read, write and trim takes the device lock for its whole duration,
//! so offset resolution, the chain walk, allocation and the size update are
//! atomic with respect to each other. The lock is a single coarse
//! `parking_lot::Mutex`; waiting for it can be abandoned through a
//! [`CancelToken`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use scull_storage::{Geometry, SegmentChain};
use tracing::{debug, trace, warn};

use crate::cancel::CancelToken;
use crate::config::{DeviceConfig, SharedDefaults};
use crate::error::{CoreError, CoreResult};
use crate::stats::DeviceStats;
use crate::transfer::{TransferSink, TransferSource};

/// Everything guarded by the device lock.
struct DeviceState {
    chain: SegmentChain,
    /// Bytes of valid data; reads never go past it.
    size: u64,
}

/// A point-in-time view of a device's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSnapshot {
    /// Bytes of valid data.
    pub logical_size: u64,
    /// Geometry of the current chain.
    pub geometry: Geometry,
    /// Linked segments.
    pub segments: usize,
    /// Allocated quanta.
    pub quanta: usize,
    /// Bytes charged to the memory budget.
    pub allocated_bytes: usize,
}

/// A sparse, lazily allocated byte store.
///
/// Created with an empty chain. Share it behind an `Arc` and attach callers
/// with [`ScullDevice::open`]; dropping the last reference frees the chain.
pub struct ScullDevice {
    state: Mutex<DeviceState>,
    defaults: SharedDefaults,
    lock_poll_interval: Duration,
    stats: DeviceStats,
    next_handle: AtomicU64,
}

impl fmt::Debug for ScullDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScullDevice")
            .field("defaults", &self.defaults.get())
            .field("lock_poll_interval", &self.lock_poll_interval)
            .finish_non_exhaustive()
    }
}

impl ScullDevice {
    /// Creates a device whose defaults are taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured geometry is invalid.
    pub fn new(config: DeviceConfig) -> CoreResult<Self> {
        let defaults = SharedDefaults::new(config.geometry()?);
        Ok(Self::with_defaults(&config, defaults))
    }

    /// Creates a device bound to externally owned defaults.
    ///
    /// The first chain uses the current value of `defaults`; the sizes in
    /// `config` are ignored. The memory limit and lock poll interval still
    /// come from `config`.
    #[must_use]
    pub fn with_defaults(config: &DeviceConfig, defaults: SharedDefaults) -> Self {
        let chain = SegmentChain::with_budget(defaults.get(), config.budget());
        Self {
            state: Mutex::new(DeviceState { chain, size: 0 }),
            defaults,
            lock_poll_interval: config.lock_poll_interval,
            stats: DeviceStats::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Returns the defaults applied on trim.
    #[must_use]
    pub fn defaults(&self) -> &SharedDefaults {
        &self.defaults
    }

    /// Returns the device's operation counters.
    #[must_use]
    pub fn stats(&self) -> &DeviceStats {
        &self.stats
    }

    /// Returns the logical size in bytes.
    ///
    /// Blocks until the lock is available.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    /// Returns a consistent view of size and allocation.
    ///
    /// Blocks until the lock is available.
    #[must_use]
    pub fn snapshot(&self) -> DeviceSnapshot {
        let state = self.state.lock();
        DeviceSnapshot {
            logical_size: state.size,
            geometry: state.chain.geometry(),
            segments: state.chain.segment_count(),
            quanta: state.chain.quantum_count(),
            allocated_bytes: state.chain.allocated_bytes(),
        }
    }

    pub(crate) fn next_handle_id(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    /// Acquires the device lock, giving up if `cancel` fires or its timeout
    /// passes while waiting.
    fn lock(&self, cancel: &CancelToken) -> CoreResult<MutexGuard<'_, DeviceState>> {
        if let Some(guard) = self.state.try_lock() {
            return Ok(guard);
        }
        let wait = cancel.start_wait();
        loop {
            if wait.should_abandon() {
                self.stats.record_interrupted();
                debug!("device lock wait interrupted");
                return Err(CoreError::Interrupted);
            }
            if let Some(guard) = self.state.try_lock_for(wait.slice(self.lock_poll_interval)) {
                return Ok(guard);
            }
        }
    }

    fn track<T>(&self, result: CoreResult<T>) -> CoreResult<T> {
        if let Err(err) = &result {
            if !err.is_interrupted() {
                self.stats.record_error();
            }
        }
        result
    }

    /// Frees the whole chain and resets the geometry to the current
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Interrupted`] if `cancel` fires before the lock
    /// is acquired; the chain is then untouched.
    pub fn trim(&self, cancel: &CancelToken) -> CoreResult<()> {
        self.trim_to(self.defaults.get(), cancel)
    }

    /// Frees the whole chain and adopts `geometry` for the next one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Interrupted`] if `cancel` fires before the lock
    /// is acquired; the chain is then untouched.
    pub fn trim_to(&self, geometry: Geometry, cancel: &CancelToken) -> CoreResult<()> {
        let mut state = self.lock(cancel)?;
        let released = state.chain.clear(geometry);
        state.size = 0;
        drop(state);

        self.stats.record_trim();
        debug!(
            segments = released.segments,
            quanta = released.quanta,
            bytes = released.bytes,
            quantum_size = geometry.quantum_size(),
            qset_size = geometry.qset_size(),
            "trimmed device"
        );
        Ok(())
    }

    /// Copies bytes at `*offset` into `sink`, never crossing a quantum
    /// boundary or the logical size.
    ///
    /// Returns 0 at or past the end of data and when the addressed quantum
    /// is a hole. On success `*offset` advances by the returned count.
    pub(crate) fn read<S>(
        &self,
        cancel: &CancelToken,
        offset: &mut u64,
        sink: &mut S,
    ) -> CoreResult<usize>
    where
        S: TransferSink + ?Sized,
    {
        let result = self.read_locked(cancel, offset, sink);
        self.track(result)
    }

    fn read_locked<S>(&self, cancel: &CancelToken, offset: &mut u64, sink: &mut S) -> CoreResult<usize>
    where
        S: TransferSink + ?Sized,
    {
        let state = self.lock(cancel)?;
        let start = *offset;
        if start >= state.size || sink.space() == 0 {
            return Ok(0);
        }

        let geometry = state.chain.geometry();
        let position = geometry.resolve(start);
        let Some(quantum) = state.chain.quantum(position) else {
            self.stats.record_hole();
            trace!(offset = start, "read hit a hole");
            return Ok(0);
        };

        let available = usize::try_from(state.size - start).unwrap_or(usize::MAX);
        let count = sink
            .space()
            .min(available)
            .min(position.room(&geometry));
        sink.copy_from(&quantum[position.byte..position.byte + count])
            .map_err(|fault| CoreError::TransferFault {
                offset: start,
                transferred: fault.transferred,
            })?;
        drop(state);

        *offset = start + count as u64;
        self.stats.record_read(count as u64);
        trace!(offset = start, count, "read");
        Ok(count)
    }

    /// Copies bytes from `source` to `*offset`, allocating as needed and
    /// never crossing a quantum boundary.
    ///
    /// On success `*offset` advances by the returned count and the logical
    /// size grows to cover it. On failure neither changes.
    pub(crate) fn write<S>(
        &self,
        cancel: &CancelToken,
        offset: &mut u64,
        source: &S,
    ) -> CoreResult<usize>
    where
        S: TransferSource + ?Sized,
    {
        if source.is_empty() {
            return Ok(0);
        }
        let result = self.write_locked(cancel, offset, source);
        self.track(result)
    }

    fn write_locked<S>(&self, cancel: &CancelToken, offset: &mut u64, source: &S) -> CoreResult<usize>
    where
        S: TransferSource + ?Sized,
    {
        let mut state = self.lock(cancel)?;
        let start = *offset;
        let geometry = state.chain.geometry();
        let position = geometry.resolve(start);
        let count = source.len().min(position.room(&geometry));
        let end = start
            .checked_add(count as u64)
            .ok_or(CoreError::OffsetOverflow { offset: start })?;

        let quantum = state.chain.quantum_mut(position).map_err(|err| {
            warn!(offset = start, error = %err, "write allocation failed");
            err
        })?;
        source
            .copy_to(&mut quantum[position.byte..position.byte + count])
            .map_err(|fault| CoreError::TransferFault {
                offset: start,
                transferred: fault.transferred,
            })?;

        if end > state.size {
            state.size = end;
        }
        drop(state);

        *offset = end;
        self.stats.record_write(count as u64);
        trace!(offset = start, count, "write");
        Ok(count)
    }
}
