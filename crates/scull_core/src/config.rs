//! Device configuration and device-wide defaults.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use scull_storage::{Geometry, MemoryBudget, DEFAULT_QSET_SIZE, DEFAULT_QUANTUM_SIZE};

use crate::error::CoreResult;

/// Configuration for constructing a device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Size of one quantum in bytes.
    pub quantum_size: usize,

    /// Number of quantum slots per segment.
    pub qset_size: usize,

    /// Upper bound on bytes the chain may allocate (`None` = unbounded).
    pub memory_limit: Option<usize>,

    /// How long a blocked lock wait sleeps before rechecking cancellation.
    pub lock_poll_interval: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            quantum_size: DEFAULT_QUANTUM_SIZE,
            qset_size: DEFAULT_QSET_SIZE,
            memory_limit: None,
            lock_poll_interval: Duration::from_millis(10),
        }
    }
}

impl DeviceConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the quantum size.
    #[must_use]
    pub const fn quantum_size(mut self, size: usize) -> Self {
        self.quantum_size = size;
        self
    }

    /// Sets the qset size.
    #[must_use]
    pub const fn qset_size(mut self, size: usize) -> Self {
        self.qset_size = size;
        self
    }

    /// Caps the bytes the chain may allocate.
    #[must_use]
    pub const fn memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = Some(limit);
        self
    }

    /// Sets the lock poll interval.
    #[must_use]
    pub const fn lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }

    /// Validates the configured sizes into a geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if either size is zero or their product overflows.
    pub fn geometry(&self) -> CoreResult<Geometry> {
        Ok(Geometry::new(self.quantum_size, self.qset_size)?)
    }

    pub(crate) fn budget(&self) -> MemoryBudget {
        self.memory_limit
            .map_or(MemoryBudget::unbounded(), MemoryBudget::limited)
    }
}

/// The device-wide default geometry, applied whenever a chain is trimmed.
///
/// Cloning yields another handle to the same value, so several devices can
/// share one set of defaults. Changing it never alters an existing chain;
/// the new geometry takes effect at the next trim.
#[derive(Debug, Clone, Default)]
pub struct SharedDefaults {
    inner: Arc<RwLock<Geometry>>,
}

impl SharedDefaults {
    /// Creates defaults holding `geometry`.
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(geometry)),
        }
    }

    /// Returns the current default geometry.
    #[must_use]
    pub fn get(&self) -> Geometry {
        *self.inner.read()
    }

    /// Replaces the default geometry.
    pub fn set(&self, geometry: Geometry) {
        *self.inner.write() = geometry;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = DeviceConfig::default();
        assert_eq!(config.quantum_size, 400);
        assert_eq!(config.qset_size, 100);
        assert!(config.memory_limit.is_none());
        assert_eq!(config.geometry().unwrap(), Geometry::default());
    }

    #[test]
    fn builder_pattern() {
        let config = DeviceConfig::new()
            .quantum_size(4)
            .qset_size(2)
            .memory_limit(1024)
            .lock_poll_interval(Duration::from_millis(1));

        assert_eq!(config.geometry().unwrap(), Geometry::new(4, 2).unwrap());
        assert_eq!(config.budget().limit(), Some(1024));
        assert_eq!(config.lock_poll_interval, Duration::from_millis(1));
    }

    #[test]
    fn zero_quantum_is_rejected() {
        assert!(DeviceConfig::new().quantum_size(0).geometry().is_err());
    }

    #[test]
    fn shared_defaults_are_shared() {
        let defaults = SharedDefaults::default();
        let other = defaults.clone();
        let geometry = Geometry::new(8, 8).unwrap();

        other.set(geometry);
        assert_eq!(defaults.get(), geometry);
    }
}
