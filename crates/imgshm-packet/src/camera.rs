//! Camera type tags.
//!
//! Every data packet starts with a 32-bit little-endian tag naming its shape.
//! The tag is independent of the envelope that announced the packet.

use std::fmt;

use crate::layout::{DUAL_HEADER_SIZE, SINGLE_HEADER_SIZE};

/// Packet shape tag carried in the first 4 bytes of every data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraType {
    /// Single 8-bit image.
    Mono8,
    /// Single 24-bit image.
    Mono24,
    /// Left/right pair of 8-bit images.
    Stereo8,
    /// Left/right pair of 24-bit images.
    Stereo24,
    /// Color image plus depth image.
    PairedModality,
    /// A tag this build does not know.
    Unknown(u32),
}

impl CameraType {
    pub const TAG_MONO_8: u32 = 0;
    pub const TAG_MONO_24: u32 = 1;
    pub const TAG_STEREO_8: u32 = 2;
    pub const TAG_STEREO_24: u32 = 3;
    pub const TAG_PAIRED_MODALITY: u32 = 4;

    /// Map a wire tag to a camera type. Never fails.
    pub const fn from_tag(tag: u32) -> Self {
        match tag {
            Self::TAG_MONO_8 => Self::Mono8,
            Self::TAG_MONO_24 => Self::Mono24,
            Self::TAG_STEREO_8 => Self::Stereo8,
            Self::TAG_STEREO_24 => Self::Stereo24,
            Self::TAG_PAIRED_MODALITY => Self::PairedModality,
            other => Self::Unknown(other),
        }
    }

    /// The wire tag.
    pub const fn tag(self) -> u32 {
        match self {
            Self::Mono8 => Self::TAG_MONO_8,
            Self::Mono24 => Self::TAG_MONO_24,
            Self::Stereo8 => Self::TAG_STEREO_8,
            Self::Stereo24 => Self::TAG_STEREO_24,
            Self::PairedModality => Self::TAG_PAIRED_MODALITY,
            Self::Unknown(tag) => tag,
        }
    }

    /// The modality this camera type belongs to, if known.
    pub const fn modality(self) -> Option<Modality> {
        match self {
            Self::Mono8 | Self::Mono24 => Some(Modality::Mono),
            Self::Stereo8 | Self::Stereo24 => Some(Modality::Stereo),
            Self::PairedModality => Some(Modality::PairedModality),
            Self::Unknown(_) => None,
        }
    }

    /// Nominal bits per pixel of the (first) image.
    pub const fn bit_depth(self) -> Option<u8> {
        match self {
            Self::Mono8 | Self::Stereo8 => Some(8),
            Self::Mono24 | Self::Stereo24 | Self::PairedModality => Some(24),
            Self::Unknown(_) => None,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Mono8 => "MONO_8",
            Self::Mono24 => "MONO_24",
            Self::Stereo8 => "STEREO_8",
            Self::Stereo24 => "STEREO_24",
            Self::PairedModality => "PAIRED_MODALITY",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl From<u32> for CameraType {
    fn from(tag: u32) -> Self {
        Self::from_tag(tag)
    }
}

impl From<CameraType> for u32 {
    fn from(camera_type: CameraType) -> Self {
        camera_type.tag()
    }
}

impl fmt::Display for CameraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(tag) => write!(f, "UNKNOWN({tag})"),
            known => f.write_str(known.name()),
        }
    }
}

/// The semantic image kind a reader is specialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Mono,
    Stereo,
    PairedModality,
}

impl Modality {
    /// Whether `camera_type` belongs to this modality.
    pub fn accepts(self, camera_type: CameraType) -> bool {
        camera_type.modality() == Some(self)
    }

    /// Packet layout used by this modality.
    pub const fn layout(self) -> Layout {
        match self {
            Self::Mono => Layout::Single,
            Self::Stereo | Self::PairedModality => Layout::Dual,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Mono => "mono",
            Self::Stereo => "stereo",
            Self::PairedModality => "paired",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary packet layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Tag + one image header + one image.
    Single,
    /// Tag + shared dimensions + two stride/format pairs + two images.
    Dual,
}

impl Layout {
    /// Fixed header size in bytes, tag included.
    pub const fn header_size(self) -> usize {
        match self {
            Self::Single => SINGLE_HEADER_SIZE,
            Self::Dual => DUAL_HEADER_SIZE,
        }
    }

    /// Number of images carried.
    pub const fn image_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Dual => 2,
        }
    }
}
