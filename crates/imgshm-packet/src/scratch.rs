use imgshm_transport::PacketTransport;
use tracing::{debug, warn};

use crate::error::{ReadError, Result};

/// Default initial scratch capacity: 1 MiB.
pub const DEFAULT_SCRATCH_CAPACITY: usize = 1024 * 1024;

/// Default ceiling for scratch growth: 16 MiB.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 16 * 1024 * 1024;

/// Reusable receive buffer for raw packets.
///
/// Bytes returned by [`ScratchBuffer::read_from`] stay valid only until the
/// next read, which the borrow checker enforces.
#[derive(Debug)]
pub struct ScratchBuffer {
    buf: Vec<u8>,
    max_capacity: usize,
}

impl ScratchBuffer {
    /// Allocate `capacity` bytes, allowing growth up to `max_capacity`.
    pub fn new(capacity: usize, max_capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            max_capacity: max_capacity.max(capacity),
        }
    }

    /// Current capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Growth ceiling in bytes.
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Make room for a packet of `len` bytes.
    pub fn ensure(&mut self, len: usize) -> Result<(), ReadError> {
        if len <= self.buf.len() {
            return Ok(());
        }
        if len > self.max_capacity {
            return Err(ReadError::PacketTooLarge {
                size: len,
                max: self.max_capacity,
            });
        }
        debug!(from = self.buf.len(), to = len, "growing scratch buffer");
        self.buf.resize(len, 0);
        Ok(())
    }

    /// Copy the next packet out of `transport`.
    ///
    /// When the transport can report the packet size up front the buffer grows
    /// to fit it. A packet beyond the growth ceiling is still consumed, so the
    /// channel stays aligned, and then reported as `PacketTooLarge`.
    ///
    /// Transports that cannot report the size never trigger growth. A larger
    /// packet is cut to the current capacity and the decoder then rejects it
    /// as `InconsistentLength`; size the scratch for the largest frame there.
    pub fn read_from<T>(&mut self, transport: &mut T) -> Result<&[u8], ReadError>
    where
        T: PacketTransport + ?Sized,
    {
        let hinted = transport.next_packet_len();
        if let Some(next) = hinted {
            if let Err(err) = self.ensure(next) {
                let _ = transport.read_packet(&mut self.buf)?;
                warn!(size = next, max = self.max_capacity, "discarded oversized packet");
                return Err(err);
            }
        }
        let n = transport.read_packet(&mut self.buf)?;
        if hinted.is_none() && n > 0 && n == self.buf.len() {
            warn!(
                capacity = n,
                "packet filled the scratch buffer and may be truncated"
            );
        }
        Ok(&self.buf[..n])
    }
}

impl Default for ScratchBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SCRATCH_CAPACITY, DEFAULT_MAX_PACKET_SIZE)
    }
}
