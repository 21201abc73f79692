//! Packet transport abstraction for shared-memory image channels.
//!
//! A transport moves discrete packets from a producer to a consumer and
//! reports whether more are queued. Readers only ever see it through the
//! [`PacketTransport`] trait:
//! - [`MemoryQueue`]: in-process bounded packet ring
//! - [`DatagramSocket`]: Unix datagram sockets (Linux/macOS)
//!
//! This is the lowest layer of imgshm. Packet decoding builds on top of it.

pub mod config;
pub mod error;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod datagram;

pub use config::{
    Role, TransportConfig, CAMERA_DOWNWARD, CAMERA_FORWARD_LEFT, CAMERA_FORWARD_RIGHT,
    CAMERA_NONE,
};
pub use error::{Result, TransportError};
pub use memory::MemoryQueue;
pub use traits::{PacketSink, PacketTransport};

#[cfg(unix)]
pub use datagram::DatagramSocket;
