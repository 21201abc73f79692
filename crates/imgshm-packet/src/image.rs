//! Image views over packet bytes and their owned counterparts.

use std::fmt;

use bytes::Bytes;

use crate::error::{PacketError, Result};

/// Pixel format tag carried per image.
///
/// Tags follow the OpenCV type-code convention: the low three bits select the
/// element depth and the remaining bits hold `channels - 1`. Tags outside that
/// scheme are carried verbatim; only stride checks depend on decoding them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat(pub i32);

impl PixelFormat {
    /// One 8-bit channel.
    pub const MONO8: Self = Self(0);
    /// One 16-bit channel (depth maps).
    pub const MONO16: Self = Self(2);
    /// Three 8-bit channels.
    pub const BGR8: Self = Self(16);
    /// Four 8-bit channels.
    pub const BGRA8: Self = Self(24);

    const DEPTH_MASK: i32 = 0x7;
    const CHANNEL_SHIFT: i32 = 3;
    const MAX_CHANNELS: i32 = 512;

    /// Build a tag from element depth code and channel count.
    pub const fn new(depth: i32, channels: i32) -> Self {
        Self((depth & Self::DEPTH_MASK) | ((channels - 1) << Self::CHANNEL_SHIFT))
    }

    /// Raw tag.
    pub const fn tag(self) -> i32 {
        self.0
    }

    /// Bytes per element, if the depth code is known.
    pub fn element_size(self) -> Option<usize> {
        if self.0 < 0 {
            return None;
        }
        match self.0 & Self::DEPTH_MASK {
            0 | 1 => Some(1),
            2 | 3 => Some(2),
            4 | 5 => Some(4),
            6 => Some(8),
            _ => None,
        }
    }

    /// Number of channels, if the tag is well formed.
    pub fn channels(self) -> Option<usize> {
        if self.0 < 0 {
            return None;
        }
        let channels = (self.0 >> Self::CHANNEL_SHIFT) + 1;
        (channels <= Self::MAX_CHANNELS).then_some(channels as usize)
    }

    /// Bytes per pixel, if the tag is well formed.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        Some(self.element_size()? * self.channels()?)
    }
}

impl From<i32> for PixelFormat {
    fn from(tag: i32) -> Self {
        Self(tag)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.element_size(), self.channels()) {
            (Some(size), Some(channels)) => write!(f, "{}x{}B", channels, size),
            _ => write!(f, "tag:{}", self.0),
        }
    }
}

/// Minimum stride for `columns` pixels of `format`, if the format is known.
pub(crate) fn min_stride(columns: u32, format: PixelFormat) -> Option<u64> {
    format
        .bytes_per_pixel()
        .map(|bpp| u64::from(columns) * bpp as u64)
}

fn check_geometry(
    rows: u32,
    columns: u32,
    format: PixelFormat,
    stride: u32,
    len: usize,
) -> Result<()> {
    let expected = u64::from(rows) * u64::from(stride);
    if expected != len as u64 {
        return Err(PacketError::BufferSize {
            expected,
            actual: len,
        });
    }
    if rows > 0 {
        if let Some(min) = min_stride(columns, format) {
            if u64::from(stride) < min {
                return Err(PacketError::StrideTooSmall { stride, min });
            }
        }
    }
    Ok(())
}

/// A borrowed image: geometry plus exactly `rows * stride` bytes of pixels.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ImageView<'a> {
    rows: u32,
    columns: u32,
    pixel_format: PixelFormat,
    stride: u32,
    data: &'a [u8],
}

impl<'a> ImageView<'a> {
    /// Build a view, checking that `data` matches the geometry.
    pub fn new(
        rows: u32,
        columns: u32,
        pixel_format: PixelFormat,
        stride: u32,
        data: &'a [u8],
    ) -> Result<Self> {
        check_geometry(rows, columns, pixel_format, stride, data.len())?;
        Ok(Self {
            rows,
            columns,
            pixel_format,
            stride,
            data,
        })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Bytes per row, padding included.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// All pixel bytes, row padding included.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Row `index`, padding included.
    pub fn row(&self, index: u32) -> Option<&'a [u8]> {
        if index >= self.rows {
            return None;
        }
        let start = index as usize * self.stride as usize;
        self.data.get(start..start + self.stride as usize)
    }

    /// Row `index` without trailing padding, if the pixel format is known.
    pub fn pixel_row(&self, index: u32) -> Option<&'a [u8]> {
        let width = min_stride(self.columns, self.pixel_format)?;
        self.row(index)?.get(..width as usize)
    }

    /// Copy the pixels into an owned image.
    pub fn to_decoded(&self) -> DecodedImage {
        DecodedImage {
            rows: self.rows,
            columns: self.columns,
            pixel_format: self.pixel_format,
            stride: self.stride,
            data: Bytes::copy_from_slice(self.data),
        }
    }
}

impl fmt::Debug for ImageView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageView")
            .field("rows", &self.rows)
            .field("columns", &self.columns)
            .field("pixel_format", &self.pixel_format)
            .field("stride", &self.stride)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .finish()
    }
}

/// An owned image that outlives the packet it was decoded from.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    rows: u32,
    columns: u32,
    pixel_format: PixelFormat,
    stride: u32,
    data: Bytes,
}

impl DecodedImage {
    /// Build an owned image, checking that `data` matches the geometry.
    pub fn new(
        rows: u32,
        columns: u32,
        pixel_format: PixelFormat,
        stride: u32,
        data: impl Into<Bytes>,
    ) -> Result<Self> {
        let data = data.into();
        check_geometry(rows, columns, pixel_format, stride, data.len())?;
        Ok(Self {
            rows,
            columns,
            pixel_format,
            stride,
            data,
        })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }

    /// Borrow as a view.
    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            rows: self.rows,
            columns: self.columns,
            pixel_format: self.pixel_format,
            stride: self.stride,
            data: &self.data,
        }
    }

    /// Row `index`, padding included.
    pub fn row(&self, index: u32) -> Option<&[u8]> {
        self.view().row(index)
    }

    /// Row `index` without trailing padding, if the pixel format is known.
    pub fn pixel_row(&self, index: u32) -> Option<&[u8]> {
        self.view().pixel_row(index)
    }

    /// Consume the image and return its pixel storage.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("rows", &self.rows)
            .field("columns", &self.columns)
            .field("pixel_format", &self.pixel_format)
            .field("stride", &self.stride)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_format_decodes_opencv_codes() {
        assert_eq!(PixelFormat::MONO8.bytes_per_pixel(), Some(1));
        assert_eq!(PixelFormat::MONO16.bytes_per_pixel(), Some(2));
        assert_eq!(PixelFormat::BGR8.bytes_per_pixel(), Some(3));
        assert_eq!(PixelFormat::BGRA8.bytes_per_pixel(), Some(4));
        assert_eq!(PixelFormat::new(6, 2).bytes_per_pixel(), Some(16));
        assert_eq!(PixelFormat::new(0, 3), PixelFormat::BGR8);
        assert_eq!(PixelFormat(7).bytes_per_pixel(), None);
        assert_eq!(PixelFormat(-1).bytes_per_pixel(), None);
    }

    #[test]
    fn view_rows_skip_padding() {
        // 2 rows, 3 mono pixels each, stride 4.
        let data = [1, 2, 3, 0xEE, 4, 5, 6, 0xEE];
        let view = ImageView::new(2, 3, PixelFormat::MONO8, 4, &data).unwrap();

        assert_eq!(view.row(1), Some(&[4, 5, 6, 0xEE][..]));
        assert_eq!(view.pixel_row(0), Some(&[1, 2, 3][..]));
        assert_eq!(view.row(2), None);
    }

    #[test]
    fn view_rejects_wrong_buffer_length() {
        let data = [0u8; 7];
        let err = ImageView::new(2, 3, PixelFormat::MONO8, 4, &data).unwrap_err();
        assert!(matches!(
            err,
            PacketError::BufferSize {
                expected: 8,
                actual: 7
            }
        ));
    }

    #[test]
    fn view_rejects_narrow_stride() {
        let data = [0u8; 8];
        let err = ImageView::new(2, 3, PixelFormat::BGR8, 4, &data).unwrap_err();
        assert!(matches!(err, PacketError::StrideTooSmall { stride: 4, min: 9 }));
    }

    #[test]
    fn unknown_format_skips_stride_check() {
        let data = [0u8; 2];
        let view = ImageView::new(1, 100, PixelFormat(7), 2, &data).unwrap();
        assert_eq!(view.pixel_row(0), None);
        assert_eq!(view.row(0).map(<[u8]>::len), Some(2));
    }

    #[test]
    fn decoded_image_owns_a_copy() {
        let mut data = vec![9u8; 6];
        let decoded = ImageView::new(2, 3, PixelFormat::MONO8, 3, &data)
            .unwrap()
            .to_decoded();
        data.fill(0);

        assert_eq!(decoded.data().as_ref(), &[9u8; 6]);
        assert_eq!(decoded.view().rows(), 2);
        assert!(!decoded.is_empty());
    }

    #[test]
    fn zero_row_image_is_valid() {
        let decoded = DecodedImage::new(0, 640, PixelFormat::MONO8, 640, Vec::new()).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.row(0), None);
    }
}
