//! Camera image packet framing, validation and zero-copy decoding.
//!
//! A producer publishes each frame as two packets on one channel:
//! - A 4-byte probe packet carrying the [`CameraType`] tag
//! - A data packet: the same tag, a fixed header, then one or two images
//!
//! Declared image sizes must reconcile exactly with the received packet
//! length before any pixel byte is looked at. Decoded images are copied out
//! of the reusable scratch buffer, so they outlive the next read.

pub mod camera;
pub mod envelope;
pub mod error;
pub mod image;
pub mod layout;
pub mod probe;
pub mod reader;
pub mod scratch;
pub mod writer;

pub use camera::{CameraType, Layout, Modality};
pub use envelope::{
    Envelope, ImageAvailable, ENVELOPE_HEADER_SIZE, IMAGE_AVAILABLE_LEN, MSG_ID_IMAGE_AVAILABLE,
};
pub use error::{PacketError, PublishError, ReadError, Result};
pub use image::{DecodedImage, ImageView, PixelFormat};
pub use layout::{
    decode_dual, decode_single, encode_dual, encode_probe, encode_single, view_dual, view_single,
    DUAL_HEADER_SIZE, SINGLE_HEADER_SIZE, TAG_SIZE,
};
pub use probe::probe;
pub use reader::{ClientConfig, ClientStats, ImageClient, MonoFrame, PairedFrame, StereoFrame};
pub use scratch::{ScratchBuffer, DEFAULT_MAX_PACKET_SIZE, DEFAULT_SCRATCH_CAPACITY};
pub use writer::ImagePublisher;
