//! Binary packet layouts and their decoders.
//!
//! All integers are little-endian.
//!
//! Single-image packet:
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬──────────┬──────────────────┐
//! │ Tag (4B) │ Cols (4B)│ Rows (4B)│Stride(4B)│Format(4B)│ rows*stride bytes│
//! └──────────┴──────────┴──────────┴──────────┴──────────┴──────────────────┘
//! ```
//!
//! Dual-image packet (both images share cols/rows):
//! ```text
//! ┌─────┬──────┬──────┬─────────┬─────────┬─────────┬─────────┬─────────────┬─────────────┐
//! │ Tag │ Cols │ Rows │ Stride1 │ Format1 │ Stride2 │ Format2 │ rows*stride1│ rows*stride2│
//! └─────┴──────┴──────┴─────────┴─────────┴─────────┴─────────┴─────────────┴─────────────┘
//! ```
//!
//! Nothing past the fixed header is touched until the declared image sizes
//! reconcile exactly with the packet length.

use bytes::{BufMut, BytesMut};

use crate::camera::CameraType;
use crate::error::{PacketError, Result};
use crate::image::{DecodedImage, ImageView, PixelFormat};

/// Camera tag: 4 bytes.
pub const TAG_SIZE: usize = 4;

/// Tag + columns + rows + stride + format.
pub const SINGLE_HEADER_SIZE: usize = 20;

/// Tag + columns + rows + (stride + format) * 2.
pub const DUAL_HEADER_SIZE: usize = 28;

const COLUMNS_OFFSET: usize = 4;
const ROWS_OFFSET: usize = 8;
const STRIDE_OFFSET: usize = 12;
const FORMAT_OFFSET: usize = 16;
const STRIDE2_OFFSET: usize = 20;
const FORMAT2_OFFSET: usize = 24;

/// Geometry of one embedded image, as declared on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub columns: i32,
    pub rows: i32,
    pub stride: u32,
    pub pixel_format: i32,
}

impl ImageHeader {
    /// Rows and columns, rejecting negative values.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        match (u32::try_from(self.rows), u32::try_from(self.columns)) {
            (Ok(rows), Ok(columns)) => Ok((rows, columns)),
            _ => Err(PacketError::InvalidDimensions {
                columns: self.columns,
                rows: self.rows,
            }),
        }
    }

    /// Declared pixel byte count, `rows * stride`.
    pub fn data_len(&self) -> Result<u64> {
        let (rows, _) = self.dimensions()?;
        Ok(u64::from(rows) * u64::from(self.stride))
    }
}

/// Header of a single-image packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleHeader {
    pub camera_type: CameraType,
    pub image: ImageHeader,
}

/// Header of a dual-image packet.
///
/// `second` repeats the shared columns/rows of `first`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualHeader {
    pub camera_type: CameraType,
    pub first: ImageHeader,
    pub second: ImageHeader,
}

fn read_u32(packet: &[u8], offset: usize) -> u32 {
    let b = &packet[offset..offset + 4];
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn read_i32(packet: &[u8], offset: usize) -> i32 {
    let b = &packet[offset..offset + 4];
    i32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn require_len(packet: &[u8], min: usize) -> Result<()> {
    if packet.len() < min {
        return Err(PacketError::TruncatedPacket {
            len: packet.len(),
            min,
        });
    }
    Ok(())
}

/// Read the camera tag at offset 0.
pub fn read_camera_type(packet: &[u8]) -> Result<CameraType> {
    require_len(packet, TAG_SIZE)?;
    Ok(CameraType::from_tag(read_u32(packet, 0)))
}

/// Parse the fixed header of a single-image packet.
pub fn parse_single_header(packet: &[u8]) -> Result<SingleHeader> {
    require_len(packet, SINGLE_HEADER_SIZE)?;
    Ok(SingleHeader {
        camera_type: CameraType::from_tag(read_u32(packet, 0)),
        image: ImageHeader {
            columns: read_i32(packet, COLUMNS_OFFSET),
            rows: read_i32(packet, ROWS_OFFSET),
            stride: read_u32(packet, STRIDE_OFFSET),
            pixel_format: read_i32(packet, FORMAT_OFFSET),
        },
    })
}

/// Parse the fixed header of a dual-image packet.
pub fn parse_dual_header(packet: &[u8]) -> Result<DualHeader> {
    require_len(packet, DUAL_HEADER_SIZE)?;
    let columns = read_i32(packet, COLUMNS_OFFSET);
    let rows = read_i32(packet, ROWS_OFFSET);
    Ok(DualHeader {
        camera_type: CameraType::from_tag(read_u32(packet, 0)),
        first: ImageHeader {
            columns,
            rows,
            stride: read_u32(packet, STRIDE_OFFSET),
            pixel_format: read_i32(packet, FORMAT_OFFSET),
        },
        second: ImageHeader {
            columns,
            rows,
            stride: read_u32(packet, STRIDE2_OFFSET),
            pixel_format: read_i32(packet, FORMAT2_OFFSET),
        },
    })
}

fn check_tag(probed: CameraType, embedded: CameraType) -> Result<()> {
    if probed != embedded {
        return Err(PacketError::TagMismatch { probed, embedded });
    }
    Ok(())
}

fn check_total(declared: u64, packet: &[u8]) -> Result<()> {
    if declared != packet.len() as u64 {
        return Err(PacketError::InconsistentLength {
            declared,
            actual: packet.len(),
        });
    }
    Ok(())
}

fn view_of<'a>(header: &ImageHeader, data: &'a [u8]) -> Result<ImageView<'a>> {
    let (rows, columns) = header.dimensions()?;
    ImageView::new(
        rows,
        columns,
        PixelFormat(header.pixel_format),
        header.stride,
        data,
    )
}

/// Validate a single-image packet and borrow its image.
///
/// `probed` is the camera type announced by the preceding probe packet; the
/// tag embedded at offset 0 must agree with it.
pub fn view_single(packet: &[u8], probed: CameraType) -> Result<ImageView<'_>> {
    let header = parse_single_header(packet)?;
    check_tag(probed, header.camera_type)?;

    let declared = (SINGLE_HEADER_SIZE as u64).saturating_add(header.image.data_len()?);
    check_total(declared, packet)?;

    view_of(&header.image, &packet[SINGLE_HEADER_SIZE..])
}

/// Validate a dual-image packet and borrow both images.
pub fn view_dual(packet: &[u8], probed: CameraType) -> Result<(ImageView<'_>, ImageView<'_>)> {
    let header = parse_dual_header(packet)?;
    check_tag(probed, header.camera_type)?;

    // A pair whose row counts differ cannot be expressed by this header; such
    // a packet fails here like any other corruption.
    let first_len = header.first.data_len()?;
    let second_len = header.second.data_len()?;
    let declared = (DUAL_HEADER_SIZE as u64)
        .saturating_add(first_len)
        .saturating_add(second_len);
    check_total(declared, packet)?;

    let (first, second) = packet[DUAL_HEADER_SIZE..].split_at(first_len as usize);
    Ok((view_of(&header.first, first)?, view_of(&header.second, second)?))
}

/// Decode a single-image packet into an owned image.
pub fn decode_single(packet: &[u8], probed: CameraType) -> Result<DecodedImage> {
    Ok(view_single(packet, probed)?.to_decoded())
}

/// Decode a dual-image packet into two owned images.
pub fn decode_dual(packet: &[u8], probed: CameraType) -> Result<(DecodedImage, DecodedImage)> {
    let (first, second) = view_dual(packet, probed)?;
    Ok((first.to_decoded(), second.to_decoded()))
}

/// Total wire size of a single-image packet.
pub fn single_packet_len(rows: u32, stride: u32) -> u64 {
    SINGLE_HEADER_SIZE as u64 + u64::from(rows) * u64::from(stride)
}

/// Total wire size of a dual-image packet.
pub fn dual_packet_len(rows: u32, stride1: u32, stride2: u32) -> u64 {
    DUAL_HEADER_SIZE as u64 + u64::from(rows) * (u64::from(stride1) + u64::from(stride2))
}

/// Encode the 4-byte probe packet announcing `camera_type`.
pub fn encode_probe(camera_type: CameraType, dst: &mut BytesMut) {
    dst.reserve(TAG_SIZE);
    dst.put_u32_le(camera_type.tag());
}

fn wire_dimensions(image: &ImageView<'_>) -> Result<(i32, i32)> {
    match (i32::try_from(image.columns()), i32::try_from(image.rows())) {
        (Ok(columns), Ok(rows)) => Ok((columns, rows)),
        _ => Err(PacketError::InvalidDimensions {
            columns: image.columns() as i32,
            rows: image.rows() as i32,
        }),
    }
}

/// Encode a single-image packet.
pub fn encode_single(
    camera_type: CameraType,
    image: &ImageView<'_>,
    dst: &mut BytesMut,
) -> Result<()> {
    let (columns, rows) = wire_dimensions(image)?;
    dst.reserve(SINGLE_HEADER_SIZE + image.data().len());
    dst.put_u32_le(camera_type.tag());
    dst.put_i32_le(columns);
    dst.put_i32_le(rows);
    dst.put_u32_le(image.stride());
    dst.put_i32_le(image.pixel_format().tag());
    dst.put_slice(image.data());
    Ok(())
}

/// Encode a dual-image packet. Both images must share rows and columns.
pub fn encode_dual(
    camera_type: CameraType,
    first: &ImageView<'_>,
    second: &ImageView<'_>,
    dst: &mut BytesMut,
) -> Result<()> {
    if first.rows() != second.rows() || first.columns() != second.columns() {
        return Err(PacketError::DimensionMismatch {
            first_columns: first.columns(),
            first_rows: first.rows(),
            second_columns: second.columns(),
            second_rows: second.rows(),
        });
    }
    let (columns, rows) = wire_dimensions(first)?;
    dst.reserve(DUAL_HEADER_SIZE + first.data().len() + second.data().len());
    dst.put_u32_le(camera_type.tag());
    dst.put_i32_le(columns);
    dst.put_i32_le(rows);
    dst.put_u32_le(first.stride());
    dst.put_i32_le(first.pixel_format().tag());
    dst.put_u32_le(second.stride());
    dst.put_i32_le(second.pixel_format().tag());
    dst.put_slice(first.data());
    dst.put_slice(second.data());
    Ok(())
}
