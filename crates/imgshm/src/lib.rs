//! Camera frame transport over shared-memory style packet channels.
//!
//! imgshm lets a vision consumer pull mono, stereo and color+depth frames
//! published by a producer process, validating every packet before any pixel
//! is trusted.
//!
//! # Crate Structure
//!
//! - [`transport`]: packet transport abstraction (in-process queue, Unix datagrams)
//! - [`packet`]: packet layouts, decoders, frame readers and publisher

/// Re-export transport types.
pub mod transport {
    pub use imgshm_transport::*;
}

/// Re-export packet types.
pub mod packet {
    pub use imgshm_packet::*;
}

pub use imgshm_packet::{
    ClientConfig, Envelope, ImageClient, ImagePublisher, MonoFrame, PairedFrame, StereoFrame,
};
pub use imgshm_transport::{MemoryQueue, PacketSink, PacketTransport, TransportConfig};
