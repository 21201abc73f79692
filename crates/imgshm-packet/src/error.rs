use imgshm_transport::TransportError;

use crate::camera::{CameraType, Modality};

/// Errors raised while parsing or building a single packet.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// Fewer bytes than the fixed header of the layout.
    #[error("truncated packet ({len} bytes, header needs {min})")]
    TruncatedPacket { len: usize, min: usize },

    /// Declared image sizes do not reconcile with the bytes received.
    #[error("inconsistent packet length (header declares {declared} bytes, received {actual})")]
    InconsistentLength { declared: u64, actual: usize },

    /// Negative rows or columns in the header.
    #[error("invalid image dimensions ({columns}x{rows})")]
    InvalidDimensions { columns: i32, rows: i32 },

    /// Row stride narrower than one row of pixels.
    #[error("row stride {stride} smaller than pixel row of {min} bytes")]
    StrideTooSmall { stride: u32, min: u64 },

    /// The tag inside the data packet differs from the probed tag.
    #[error("packet tag {embedded} does not match probed type {probed}")]
    TagMismatch {
        probed: CameraType,
        embedded: CameraType,
    },

    /// Both images of a pair must share rows and columns.
    #[error("image pair dimensions differ ({first_columns}x{first_rows} vs {second_columns}x{second_rows})")]
    DimensionMismatch {
        first_columns: u32,
        first_rows: u32,
        second_columns: u32,
        second_rows: u32,
    },

    /// Pixel storage does not match `rows * stride`.
    #[error("pixel buffer holds {actual} bytes, geometry needs {expected}")]
    BufferSize { expected: u64, actual: usize },
}

/// Errors returned by the frame readers.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The envelope is not an image-available notification.
    #[error("message {msg_id} is not an image notification")]
    NotAnImageMessage { msg_id: u32 },

    /// The transport has nothing queued.
    #[error("no data queued")]
    NoDataQueued,

    /// The probe read returned fewer bytes than a camera tag.
    #[error("short read ({actual} bytes, expected {expected})")]
    ShortRead { expected: usize, actual: usize },

    /// The probed camera type belongs to another modality.
    #[error("unexpected camera type {actual} for {expected} reader")]
    UnexpectedCameraType {
        expected: Modality,
        actual: CameraType,
    },

    /// The next packet is larger than the scratch buffer may grow.
    #[error("packet too large ({size} bytes, max {max})")]
    PacketTooLarge { size: usize, max: usize },

    /// The data packet failed validation.
    #[error("invalid packet: {0}")]
    Packet(#[from] PacketError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl ReadError {
    /// Outcomes that are part of normal polling rather than faults.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NotAnImageMessage { .. } | Self::NoDataQueued)
    }
}

/// Errors returned by the image publisher.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The camera type cannot be published through this call.
    #[error("camera type {actual} cannot be published as {expected}")]
    UnexpectedCameraType {
        expected: Modality,
        actual: CameraType,
    },

    /// The images do not form a valid packet.
    #[error("invalid packet: {0}")]
    Packet(#[from] PacketError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T, E = PacketError> = std::result::Result<T, E>;
