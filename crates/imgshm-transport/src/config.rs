//! Transport initialization parameters.
//!
//! These mirror what a shared-memory image channel needs at attach time:
//! which cameras it carries, which side of the channel we are, and how the
//! ring is sized.

/// No camera selected.
pub const CAMERA_NONE: u32 = 0;

/// Forward-facing left (or only) camera.
pub const CAMERA_FORWARD_LEFT: u32 = 1 << 0;

/// Forward-facing right camera.
pub const CAMERA_FORWARD_RIGHT: u32 = 1 << 1;

/// Downward-facing camera.
pub const CAMERA_DOWNWARD: u32 = 1 << 2;

/// Which end of the channel this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Consumer side; reads packets.
    Client,
    /// Producer side; writes packets.
    Server,
}

/// Configuration for a packet transport.
///
/// The full set of shared-memory attach parameters is carried so a config can
/// be handed to a ring-backed transport unchanged. `MemoryQueue` reads only
/// `payload_capacity` and `queue_depth`; `DatagramSocket` reads `role` and
/// `payload_capacity`. `cameras`, `slot_size` and `header_slots` are
/// informational for both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Bitmask of `CAMERA_*` flags carried by this channel.
    pub cameras: u32,
    /// Client or server role.
    pub role: Role,
    /// Size in bytes of one header slot.
    pub slot_size: usize,
    /// Number of header slots.
    pub header_slots: usize,
    /// Maximum size in bytes of a single packet.
    pub payload_capacity: usize,
    /// Maximum number of packets held before the producer is refused.
    pub queue_depth: usize,
}

impl TransportConfig {
    /// Client-side config for the given camera mask.
    pub fn client(cameras: u32) -> Self {
        Self {
            cameras,
            ..Self::default()
        }
    }

    /// Server-side config for the given camera mask.
    pub fn server(cameras: u32) -> Self {
        Self {
            cameras,
            role: Role::Server,
            ..Self::default()
        }
    }

    /// Whether the channel carries any of the cameras in `mask`.
    pub fn carries(&self, mask: u32) -> bool {
        self.cameras & mask != 0
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            cameras: CAMERA_FORWARD_LEFT,
            role: Role::Client,
            slot_size: 128,
            header_slots: 1,
            payload_capacity: 1024 * 1024,
            queue_depth: 10,
        }
    }
}
