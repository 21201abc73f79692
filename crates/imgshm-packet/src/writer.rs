use bytes::BytesMut;
use imgshm_transport::PacketSink;
use tracing::trace;

use crate::camera::{CameraType, Modality};
use crate::error::{PublishError, Result};
use crate::image::ImageView;
use crate::layout::{encode_dual, encode_single};

const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Publishes camera frames to any `PacketSink`.
///
/// Each frame is written as a 4-byte probe packet followed by the data
/// packet, which is what [`ImageClient`](crate::ImageClient) expects.
pub struct ImagePublisher<T> {
    inner: T,
    buf: BytesMut,
    published: u64,
}

impl<T: PacketSink> ImagePublisher<T> {
    /// Create a new publisher.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            published: 0,
        }
    }

    /// Publish a single image as `camera_type` (a mono type).
    pub fn publish_mono(
        &mut self,
        camera_type: CameraType,
        image: &ImageView<'_>,
    ) -> Result<(), PublishError> {
        check_modality(Modality::Mono, camera_type)?;
        self.buf.clear();
        encode_single(camera_type, image, &mut self.buf)?;
        self.send(camera_type)
    }

    /// Publish a left/right pair as `camera_type` (a stereo type).
    pub fn publish_stereo(
        &mut self,
        camera_type: CameraType,
        left: &ImageView<'_>,
        right: &ImageView<'_>,
    ) -> Result<(), PublishError> {
        check_modality(Modality::Stereo, camera_type)?;
        self.buf.clear();
        encode_dual(camera_type, left, right, &mut self.buf)?;
        self.send(camera_type)
    }

    /// Publish a color image with its depth image.
    pub fn publish_paired(
        &mut self,
        color: &ImageView<'_>,
        depth: &ImageView<'_>,
    ) -> Result<(), PublishError> {
        self.buf.clear();
        encode_dual(CameraType::PairedModality, color, depth, &mut self.buf)?;
        self.send(CameraType::PairedModality)
    }

    fn send(&mut self, camera_type: CameraType) -> Result<(), PublishError> {
        self.inner.write_packet(&camera_type.tag().to_le_bytes())?;
        self.inner.write_packet(&self.buf)?;
        self.published += 1;
        trace!(%camera_type, size = self.buf.len(), "published frame");
        Ok(())
    }

    /// Frames published since construction.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the publisher and return the inner sink.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn check_modality(expected: Modality, actual: CameraType) -> Result<(), PublishError> {
    if !expected.accepts(actual) {
        return Err(PublishError::UnexpectedCameraType { expected, actual });
    }
    Ok(())
}
