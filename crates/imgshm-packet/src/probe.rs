use imgshm_transport::PacketTransport;

use crate::camera::CameraType;
use crate::error::{ReadError, Result};
use crate::layout::{read_camera_type, TAG_SIZE};

/// Read the 4-byte probe packet that announces the next data packet's shape.
///
/// The tag is returned verbatim; unknown tags come back as
/// [`CameraType::Unknown`] and it is up to the caller to reject them.
pub fn probe<T>(transport: &mut T) -> Result<CameraType, ReadError>
where
    T: PacketTransport + ?Sized,
{
    let mut tag = [0u8; TAG_SIZE];
    let n = transport.read_packet(&mut tag)?;
    if n < TAG_SIZE {
        return Err(ReadError::ShortRead {
            expected: TAG_SIZE,
            actual: n,
        });
    }
    Ok(read_camera_type(&tag)?)
}
