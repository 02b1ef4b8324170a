//! Caller-supplied buffers.
//!
//! A device never touches caller memory directly; it copies through these
//! traits so a buffer that can fail mid-copy (memory owned by another
//! address space, a guarded region, a test double) reports a fault instead
//! of corrupting the device.

/// A copy into or out of a caller buffer failed after `transferred` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferFault {
    /// Bytes moved before the fault.
    pub transferred: usize,
}

/// A buffer the device reads write payloads from.
pub trait TransferSource {
    /// Returns the number of bytes available.
    fn len(&self) -> usize;

    /// Returns true if no bytes are available.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `dst` from the start of the source.
    ///
    /// Only called with `dst.len() <= self.len()`.
    fn copy_to(&self, dst: &mut [u8]) -> Result<(), BufferFault>;
}

/// A buffer the device copies read results into.
pub trait TransferSink {
    /// Returns how many bytes the sink can accept.
    fn space(&self) -> usize;

    /// Stores `src` at the start of the sink.
    ///
    /// Only called with `src.len() <= self.space()`.
    fn copy_from(&mut self, src: &[u8]) -> Result<(), BufferFault>;
}

impl TransferSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_to(&self, dst: &mut [u8]) -> Result<(), BufferFault> {
        let src = self
            .get(..dst.len())
            .ok_or(BufferFault { transferred: 0 })?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl TransferSource for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn copy_to(&self, dst: &mut [u8]) -> Result<(), BufferFault> {
        self.as_slice().copy_to(dst)
    }
}

impl<const N: usize> TransferSource for [u8; N] {
    fn len(&self) -> usize {
        N
    }

    fn copy_to(&self, dst: &mut [u8]) -> Result<(), BufferFault> {
        self.as_slice().copy_to(dst)
    }
}

impl TransferSink for [u8] {
    fn space(&self) -> usize {
        self.len()
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), BufferFault> {
        let dst = self
            .get_mut(..src.len())
            .ok_or(BufferFault { transferred: 0 })?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl TransferSink for Vec<u8> {
    fn space(&self) -> usize {
        self.len()
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), BufferFault> {
        self.as_mut_slice().copy_from(src)
    }
}

impl<const N: usize> TransferSink for [u8; N] {
    fn space(&self) -> usize {
        N
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), BufferFault> {
        self.as_mut_slice().copy_from(src)
    }
}
