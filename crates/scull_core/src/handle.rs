//! Open handles: the caller-facing open/read/write/release surface.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cancel::CancelToken;
use crate::device::ScullDevice;
use crate::error::{CoreError, CoreResult};
use crate::transfer::{TransferSink, TransferSource};

const READ_CHUNK: usize = 4096;

/// How a handle was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Reads only.
    ReadOnly,
    /// Writes only. Opening in this mode truncates the device.
    WriteOnly,
    /// Reads and writes.
    ReadWrite,
}

impl AccessMode {
    /// Returns true if the mode permits reading.
    #[must_use]
    pub const fn can_read(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    /// Returns true if the mode permits writing.
    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadOnly => "read-only",
            Self::WriteOnly => "write-only",
            Self::ReadWrite => "read-write",
        };
        f.write_str(name)
    }
}

impl ScullDevice {
    /// Attaches a caller to the device.
    ///
    /// Opening [`AccessMode::WriteOnly`] truncates the device first, under
    /// the device lock, so no concurrent reader can observe the chain while
    /// it is being freed.
    ///
    /// # Errors
    ///
    /// The lock wait uses a fresh token, so this does not fail in practice.
    /// Use [`ScullDevice::open_with`] to make the wait cancellable.
    pub fn open(self: &Arc<Self>, mode: AccessMode) -> CoreResult<Handle> {
        self.open_with(mode, CancelToken::new())
    }

    /// Attaches a caller whose lock waits are governed by `cancel`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Interrupted`] if a write-only open is cancelled
    /// while waiting to truncate. The device is then unchanged and no handle
    /// is created.
    pub fn open_with(self: &Arc<Self>, mode: AccessMode, cancel: CancelToken) -> CoreResult<Handle> {
        if mode == AccessMode::WriteOnly {
            self.trim(&cancel)?;
        }
        let id = self.next_handle_id();
        self.stats().record_open();
        debug!(handle = id, %mode, "opened device");
        Ok(Handle {
            device: Arc::clone(self),
            mode,
            cancel,
            id,
        })
    }
}

/// A caller's attachment to a device.
///
/// The handle carries no file position; every read and write takes the
/// offset explicitly and advances it by the number of bytes moved.
#[derive(Debug)]
pub struct Handle {
    device: Arc<ScullDevice>,
    mode: AccessMode,
    cancel: CancelToken,
    id: u64,
}

impl Handle {
    /// Returns the device this handle is attached to.
    #[must_use]
    pub fn device(&self) -> &Arc<ScullDevice> {
        &self.device
    }

    /// Returns the mode the handle was opened with.
    #[must_use]
    pub const fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Returns the handle's id, unique per device.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns the token that governs this handle's lock waits.
    ///
    /// Cancelling it abandons the handle's current or next blocked wait; the
    /// handle stays usable afterwards.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn require(&self, allowed: bool, operation: &'static str) -> CoreResult<()> {
        if allowed {
            Ok(())
        } else {
            Err(CoreError::AccessDenied {
                mode: self.mode,
                operation,
            })
        }
    }

    /// Reads at most one quantum's worth of bytes at `*offset` into `buf`.
    ///
    /// Returns the number of bytes copied; 0 means end of data or a hole at
    /// this position. `*offset` advances by the returned count.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AccessDenied`] on a write-only handle,
    /// [`CoreError::Interrupted`] if the lock wait is cancelled.
    pub fn read(&self, offset: &mut u64, buf: &mut [u8]) -> CoreResult<usize> {
        self.read_into(offset, buf)
    }

    /// Like [`Handle::read`], but copies into any [`TransferSink`].
    ///
    /// # Errors
    ///
    /// As [`Handle::read`], plus [`CoreError::TransferFault`] if the sink
    /// fails.
    pub fn read_into<S>(&self, offset: &mut u64, sink: &mut S) -> CoreResult<usize>
    where
        S: TransferSink + ?Sized,
    {
        self.read_with(offset, sink, &self.cancel)
    }

    /// Like [`Handle::read_into`], but the lock wait is governed by `cancel`
    /// instead of the handle's own token.
    ///
    /// # Errors
    ///
    /// As [`Handle::read_into`].
    pub fn read_with<S>(
        &self,
        offset: &mut u64,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> CoreResult<usize>
    where
        S: TransferSink + ?Sized,
    {
        self.require(self.mode.can_read(), "read")?;
        self.device.read(cancel, offset, sink)
    }

    /// Writes at most one quantum's worth of `data` at `*offset`.
    ///
    /// Returns the number of bytes written; `*offset` advances by it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AccessDenied`] on a read-only handle,
    /// [`CoreError::Interrupted`] if the lock wait is cancelled, or an
    /// out-of-memory storage error if allocation fails.
    pub fn write(&self, offset: &mut u64, data: &[u8]) -> CoreResult<usize> {
        self.write_from(offset, data)
    }

    /// Like [`Handle::write`], but copies from any [`TransferSource`].
    ///
    /// # Errors
    ///
    /// As [`Handle::write`], plus [`CoreError::TransferFault`] if the
    /// source fails.
    pub fn write_from<S>(&self, offset: &mut u64, source: &S) -> CoreResult<usize>
    where
        S: TransferSource + ?Sized,
    {
        self.write_with(offset, source, &self.cancel)
    }

    /// Like [`Handle::write_from`], but the lock wait is governed by
    /// `cancel` instead of the handle's own token.
    ///
    /// # Errors
    ///
    /// As [`Handle::write_from`].
    pub fn write_with<S>(
        &self,
        offset: &mut u64,
        source: &S,
        cancel: &CancelToken,
    ) -> CoreResult<usize>
    where
        S: TransferSource + ?Sized,
    {
        self.require(self.mode.can_write(), "write")?;
        self.device.write(cancel, offset, source)
    }

    /// Writes all of `data` starting at `*offset`, one quantum per call.
    ///
    /// # Errors
    ///
    /// Stops at the first failing call. Bytes written by earlier calls stay
    /// written and `*offset` reflects them.
    pub fn write_all(&self, offset: &mut u64, data: &[u8]) -> CoreResult<()> {
        let mut rest = data;
        while !rest.is_empty() {
            let n = self.write(offset, rest)?;
            rest = &rest[n..];
        }
        Ok(())
    }

    /// Reads from `*offset` until end of data or a hole, appending to `out`.
    ///
    /// Returns the total number of bytes appended.
    ///
    /// # Errors
    ///
    /// Stops at the first failing call; bytes read before it remain in
    /// `out`.
    pub fn read_to_end(&self, offset: &mut u64, out: &mut Vec<u8>) -> CoreResult<usize> {
        let mut buf = vec![0u8; READ_CHUNK];
        let mut total = 0;
        loop {
            let n = self.read(offset, &mut buf)?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&buf[..n]);
            total += n;
        }
    }

    /// Detaches from the device. Storage is not affected.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` leaves room for binding layers that track
    /// release failures.
    pub fn release(self) -> CoreResult<()> {
        self.device.stats().record_release();
        debug!(handle = self.id, "released device");
        Ok(())
    }
}
