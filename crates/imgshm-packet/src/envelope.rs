//! Envelope messages announcing that an image packet is available.
//!
//! Envelopes travel on a separate message channel. Only the image-available
//! kind matters to the readers; its scalar telemetry is exposed through
//! fixed-offset getters.
//!
//! Wire format:
//! ```text
//! ┌──────────────┬──────────────────┐
//! │ Msg ID (4B)  │ Payload          │
//! │ LE           │ (rest of packet) │
//! └──────────────┴──────────────────┘
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{PacketError, Result};

/// Message id of the image-available notification.
pub const MSG_ID_IMAGE_AVAILABLE: u32 = 103;

/// Envelope header: message id (4).
pub const ENVELOPE_HEADER_SIZE: usize = 4;

/// Payload size of an image-available notification.
pub const IMAGE_AVAILABLE_LEN: usize = 56;

/// A tagged notification from the message channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub msg_id: u32,
    pub payload: Bytes,
}

impl Envelope {
    /// Create a new envelope.
    pub fn new(msg_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            msg_id,
            payload: payload.into(),
        }
    }

    /// Wrap an image-available notification.
    pub fn image_available(info: &ImageAvailable) -> Self {
        let mut payload = BytesMut::with_capacity(IMAGE_AVAILABLE_LEN);
        info.encode(&mut payload);
        Self::new(MSG_ID_IMAGE_AVAILABLE, payload.freeze())
    }

    /// Whether this envelope announces an image.
    pub fn is_image_available(&self) -> bool {
        self.msg_id == MSG_ID_IMAGE_AVAILABLE
    }

    /// Decode an envelope from one message-channel packet.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < ENVELOPE_HEADER_SIZE {
            return Err(PacketError::TruncatedPacket {
                len: src.len(),
                min: ENVELOPE_HEADER_SIZE,
            });
        }
        let mut buf = src;
        let msg_id = buf.get_u32_le();
        Ok(Self::new(msg_id, Bytes::copy_from_slice(buf)))
    }

    /// Encode into the wire format.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(ENVELOPE_HEADER_SIZE + self.payload.len());
        dst.put_u32_le(self.msg_id);
        dst.put_slice(&self.payload);
    }

    /// The image notification carried, if any.
    pub fn image_info(&self) -> Option<ImageAvailable> {
        if !self.is_image_available() {
            return None;
        }
        ImageAvailable::decode(&self.payload)
    }

    /// Capture timestamp (microseconds).
    pub fn timestamp(&self) -> Option<u64> {
        self.image_info().map(|info| info.timestamp)
    }

    /// Time until which the image stays valid (microseconds).
    pub fn valid_until(&self) -> Option<u64> {
        self.image_info().map(|info| info.valid_until)
    }

    /// Camera serial id.
    pub fn camera_id(&self) -> Option<u64> {
        self.image_info().map(|info| info.cam_id)
    }

    /// Camera index on the vehicle.
    pub fn camera_no(&self) -> Option<u32> {
        self.image_info().map(|info| info.cam_no)
    }

    /// Roll and pitch at capture time (radians).
    pub fn roll_pitch(&self) -> Option<(f32, f32)> {
        self.image_info().map(|info| (info.roll, info.pitch))
    }

    /// Roll, pitch and yaw at capture time (radians).
    pub fn roll_pitch_yaw(&self) -> Option<(f32, f32, f32)> {
        self.image_info()
            .map(|info| (info.roll, info.pitch, info.yaw))
    }

    /// Height in the local frame (meters).
    pub fn local_height(&self) -> Option<f32> {
        self.image_info().map(|info| info.local_z)
    }

    /// Latitude, longitude and altitude at capture time.
    pub fn gps(&self) -> Option<(f32, f32, f32)> {
        self.image_info().map(|info| (info.lat, info.lon, info.alt))
    }
}

/// Scalar telemetry of an image-available notification.
///
/// Fields sit at fixed little-endian offsets: `cam_id@0`, `timestamp@8`,
/// `valid_until@16`, `cam_no@24`, then `roll`, `pitch`, `yaw`, `local_z`,
/// `lat`, `lon`, `alt` as consecutive `f32` from offset 28.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageAvailable {
    pub cam_id: u64,
    pub timestamp: u64,
    pub valid_until: u64,
    pub cam_no: u32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub local_z: f32,
    pub lat: f32,
    pub lon: f32,
    pub alt: f32,
}

impl ImageAvailable {
    /// Decode from an envelope payload. `None` if the payload is too short.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < IMAGE_AVAILABLE_LEN {
            return None;
        }
        let mut buf = payload;
        Some(Self {
            cam_id: buf.get_u64_le(),
            timestamp: buf.get_u64_le(),
            valid_until: buf.get_u64_le(),
            cam_no: buf.get_u32_le(),
            roll: buf.get_f32_le(),
            pitch: buf.get_f32_le(),
            yaw: buf.get_f32_le(),
            local_z: buf.get_f32_le(),
            lat: buf.get_f32_le(),
            lon: buf.get_f32_le(),
            alt: buf.get_f32_le(),
        })
    }

    /// Encode into an envelope payload.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(IMAGE_AVAILABLE_LEN);
        dst.put_u64_le(self.cam_id);
        dst.put_u64_le(self.timestamp);
        dst.put_u64_le(self.valid_until);
        dst.put_u32_le(self.cam_no);
        dst.put_f32_le(self.roll);
        dst.put_f32_le(self.pitch);
        dst.put_f32_le(self.yaw);
        dst.put_f32_le(self.local_z);
        dst.put_f32_le(self.lat);
        dst.put_f32_le(self.lon);
        dst.put_f32_le(self.alt);
    }
}
