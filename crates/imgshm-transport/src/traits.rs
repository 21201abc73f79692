use crate::error::Result;

/// The consumer side of a packet channel.
///
/// Packets are discrete: one `read_packet` call consumes exactly one packet,
/// whatever the size of the destination buffer. A short destination buffer
/// truncates the copy; the remainder of that packet is lost, just as with a
/// datagram read. Implementations may return `Ok(0)` when nothing is queued.
pub trait PacketTransport {
    /// Whether at least one packet is queued.
    fn bytes_waiting(&self) -> bool;

    /// Size of the next queued packet, if the transport can tell without
    /// consuming it.
    fn next_packet_len(&self) -> Option<usize> {
        None
    }

    /// Copy the next packet into `buf`, returning the number of bytes copied.
    fn read_packet(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// The producer side of a packet channel.
pub trait PacketSink {
    /// Enqueue one complete packet.
    fn write_packet(&mut self, packet: &[u8]) -> Result<()>;
}

impl<T: PacketTransport + ?Sized> PacketTransport for &mut T {
    fn bytes_waiting(&self) -> bool {
        (**self).bytes_waiting()
    }

    fn next_packet_len(&self) -> Option<usize> {
        (**self).next_packet_len()
    }

    fn read_packet(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_packet(buf)
    }
}

impl<T: PacketTransport + ?Sized> PacketTransport for Box<T> {
    fn bytes_waiting(&self) -> bool {
        (**self).bytes_waiting()
    }

    fn next_packet_len(&self) -> Option<usize> {
        (**self).next_packet_len()
    }

    fn read_packet(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_packet(buf)
    }
}

impl<T: PacketSink + ?Sized> PacketSink for &mut T {
    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        (**self).write_packet(packet)
    }
}

impl<T: PacketSink + ?Sized> PacketSink for Box<T> {
    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        (**self).write_packet(packet)
    }
}
