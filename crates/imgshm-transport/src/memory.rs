use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::trace;

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::traits::{PacketSink, PacketTransport};

/// In-process bounded packet ring.
///
/// Clones share the same queue, so one handle can be given to a producer
/// and another to a consumer (possibly on another thread).
#[derive(Clone)]
pub struct MemoryQueue {
    packets: Arc<Mutex<VecDeque<Bytes>>>,
    payload_capacity: usize,
    queue_depth: usize,
}

impl MemoryQueue {
    /// Create a queue sized from the default transport config.
    pub fn new() -> Self {
        Self::with_config(&TransportConfig::default())
    }

    /// Create a queue sized from `config`.
    pub fn with_config(config: &TransportConfig) -> Self {
        Self {
            packets: Arc::new(Mutex::new(VecDeque::with_capacity(config.queue_depth))),
            payload_capacity: config.payload_capacity,
            queue_depth: config.queue_depth,
        }
    }

    /// Number of queued packets.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum packet size accepted by `write_packet`.
    pub fn payload_capacity(&self) -> usize {
        self.payload_capacity
    }

    /// Maximum number of queued packets.
    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    /// Drop every queued packet.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Bytes>> {
        self.packets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryQueue")
            .field("queued", &self.len())
            .field("payload_capacity", &self.payload_capacity)
            .field("queue_depth", &self.queue_depth)
            .finish()
    }
}

impl PacketTransport for MemoryQueue {
    fn bytes_waiting(&self) -> bool {
        !self.is_empty()
    }

    fn next_packet_len(&self) -> Option<usize> {
        self.lock().front().map(Bytes::len)
    }

    fn read_packet(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(packet) = self.lock().pop_front() else {
            return Ok(0);
        };
        let n = packet.len().min(buf.len());
        buf[..n].copy_from_slice(&packet[..n]);
        if n < packet.len() {
            trace!(size = packet.len(), copied = n, "packet truncated on read");
        }
        Ok(n)
    }
}

impl PacketSink for MemoryQueue {
    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        if packet.len() > self.payload_capacity {
            return Err(TransportError::PacketTooLarge {
                size: packet.len(),
                capacity: self.payload_capacity,
            });
        }
        let mut packets = self.lock();
        if packets.len() >= self.queue_depth {
            return Err(TransportError::QueueFull {
                depth: self.queue_depth,
            });
        }
        packets.push_back(Bytes::copy_from_slice(packet));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_packets_in_order() {
        let mut queue = MemoryQueue::new();
        queue.write_packet(b"one").unwrap();
        queue.write_packet(b"two").unwrap();

        let mut buf = [0u8; 16];
        assert!(queue.bytes_waiting());
        assert_eq!(queue.next_packet_len(), Some(3));
        let n = queue.read_packet(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"one");
        let n = queue.read_packet(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"two");
        assert!(!queue.bytes_waiting());
    }

    #[test]
    fn empty_read_returns_zero() {
        let mut queue = MemoryQueue::new();
        let mut buf = [0u8; 4];
        assert_eq!(queue.read_packet(&mut buf).unwrap(), 0);
        assert_eq!(queue.next_packet_len(), None);
    }

    #[test]
    fn short_buffer_truncates_and_consumes_packet() {
        let mut queue = MemoryQueue::new();
        queue.write_packet(b"abcdefgh").unwrap();
        queue.write_packet(b"next").unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(queue.read_packet(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.read_packet(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"next");
    }

    #[test]
    fn queue_depth_is_enforced() {
        let cfg = TransportConfig {
            queue_depth: 2,
            ..TransportConfig::default()
        };
        let mut queue = MemoryQueue::with_config(&cfg);
        queue.write_packet(b"a").unwrap();
        queue.write_packet(b"b").unwrap();
        let err = queue.write_packet(b"c").unwrap_err();
        assert!(matches!(err, TransportError::QueueFull { depth: 2 }));
    }

    #[test]
    fn payload_capacity_is_enforced() {
        let cfg = TransportConfig {
            payload_capacity: 8,
            ..TransportConfig::default()
        };
        let mut queue = MemoryQueue::with_config(&cfg);
        let err = queue.write_packet(&[0u8; 9]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::PacketTooLarge {
                size: 9,
                capacity: 8
            }
        ));
        assert!(queue.is_empty());
    }

    #[test]
    fn clones_share_the_queue_across_threads() {
        let mut producer = MemoryQueue::new();
        let mut consumer = producer.clone();

        let handle = std::thread::spawn(move || {
            for i in 0..5u8 {
                producer.write_packet(&[i]).unwrap();
            }
        });
        handle.join().unwrap();

        let mut buf = [0u8; 1];
        for expected in 0..5u8 {
            assert_eq!(consumer.read_packet(&mut buf).unwrap(), 1);
            assert_eq!(buf[0], expected);
        }
    }
}
