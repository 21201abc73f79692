use imgshm_transport::PacketTransport;
use tracing::{debug, trace, warn};

use crate::camera::{CameraType, Modality};
use crate::envelope::Envelope;
use crate::error::{PacketError, ReadError, Result};
use crate::image::DecodedImage;
use crate::layout::{decode_dual, decode_single};
use crate::probe::probe;
use crate::scratch::{ScratchBuffer, DEFAULT_MAX_PACKET_SIZE, DEFAULT_SCRATCH_CAPACITY};

/// Configuration for an [`ImageClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Drain the queue on every read and keep only the newest frame.
    pub subscribe_latest: bool,
    /// Initial scratch buffer size in bytes. Default: 1 MiB.
    pub scratch_capacity: usize,
    /// Largest packet the scratch buffer may grow to. Default: 16 MiB.
    pub max_packet_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            subscribe_latest: false,
            scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }
}

/// Counters kept by an [`ImageClient`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Frames handed back to the caller.
    pub frames_delivered: u64,
    /// Frames decoded and dropped while draining to the newest one.
    pub frames_discarded: u64,
    /// Reads that failed after touching the transport.
    pub reads_failed: u64,
}

/// One mono image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoFrame {
    pub camera_type: CameraType,
    pub image: DecodedImage,
}

/// A left/right stereo pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StereoFrame {
    pub camera_type: CameraType,
    pub left: DecodedImage,
    pub right: DecodedImage,
}

/// A color image with its matching depth image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedFrame {
    pub camera_type: CameraType,
    pub color: DecodedImage,
    pub depth: DecodedImage,
}

/// Reads camera frames from a packet transport.
///
/// Each frame arrives as two packets: a 4-byte probe carrying the camera
/// type, then the data packet. The client owns its scratch buffer, so one
/// instance must not be shared between threads; give each thread its own.
pub struct ImageClient<T> {
    inner: T,
    scratch: ScratchBuffer,
    config: ClientConfig,
    stats: ClientStats,
}

impl<T: PacketTransport> ImageClient<T> {
    /// Create a new client with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ClientConfig::default())
    }

    /// Create a new client with explicit configuration.
    pub fn with_config(inner: T, config: ClientConfig) -> Self {
        Self {
            inner,
            scratch: ScratchBuffer::new(config.scratch_capacity, config.max_packet_size),
            config,
            stats: ClientStats::default(),
        }
    }

    /// Read a mono frame announced by `envelope`.
    pub fn try_read_mono(&mut self, envelope: &Envelope) -> Result<MonoFrame, ReadError> {
        self.read_latest(envelope, Modality::Mono, |packet, camera_type| {
            Ok(MonoFrame {
                camera_type,
                image: decode_single(packet, camera_type)?,
            })
        })
    }

    /// Read a stereo pair announced by `envelope`.
    pub fn try_read_stereo(&mut self, envelope: &Envelope) -> Result<StereoFrame, ReadError> {
        self.read_latest(envelope, Modality::Stereo, |packet, camera_type| {
            let (left, right) = decode_dual(packet, camera_type)?;
            Ok(StereoFrame {
                camera_type,
                left,
                right,
            })
        })
    }

    /// Read a color + depth pair announced by `envelope`.
    pub fn try_read_paired(&mut self, envelope: &Envelope) -> Result<PairedFrame, ReadError> {
        self.read_latest(envelope, Modality::PairedModality, |packet, camera_type| {
            let (color, depth) = decode_dual(packet, camera_type)?;
            Ok(PairedFrame {
                camera_type,
                color,
                depth,
            })
        })
    }

    /// Polling form of [`try_read_mono`](Self::try_read_mono): every failure is `None`.
    pub fn read_mono(&mut self, envelope: &Envelope) -> Option<MonoFrame> {
        report(self.try_read_mono(envelope))
    }

    /// Polling form of [`try_read_stereo`](Self::try_read_stereo).
    pub fn read_stereo(&mut self, envelope: &Envelope) -> Option<StereoFrame> {
        report(self.try_read_stereo(envelope))
    }

    /// Polling form of [`try_read_paired`](Self::try_read_paired).
    pub fn read_paired(&mut self, envelope: &Envelope) -> Option<PairedFrame> {
        report(self.try_read_paired(envelope))
    }

    fn read_latest<R, F>(
        &mut self,
        envelope: &Envelope,
        modality: Modality,
        decode: F,
    ) -> Result<R, ReadError>
    where
        F: Fn(&[u8], CameraType) -> Result<R, PacketError>,
    {
        if !envelope.is_image_available() {
            return Err(ReadError::NotAnImageMessage {
                msg_id: envelope.msg_id,
            });
        }
        if !self.inner.bytes_waiting() {
            return Err(ReadError::NoDataQueued);
        }

        let result = self.drain(modality, decode);
        match &result {
            Ok(_) => self.stats.frames_delivered += 1,
            Err(_) => self.stats.reads_failed += 1,
        }
        result
    }

    fn drain<R, F>(&mut self, modality: Modality, decode: F) -> Result<R, ReadError>
    where
        F: Fn(&[u8], CameraType) -> Result<R, PacketError>,
    {
        loop {
            let camera_type = probe(&mut self.inner)?;
            if !modality.accepts(camera_type) {
                // Drop the data packet that follows the probe so the next
                // read starts on a probe again.
                self.inner.read_packet(&mut [0u8; 0])?;
                trace!(%camera_type, "skipped packet of another modality");
                return Err(ReadError::UnexpectedCameraType {
                    expected: modality,
                    actual: camera_type,
                });
            }

            let packet = self.scratch.read_from(&mut self.inner)?;
            let frame = decode(packet, camera_type)?;

            if !(self.config.subscribe_latest && self.inner.bytes_waiting()) {
                return Ok(frame);
            }
            self.stats.frames_discarded += 1;
            debug!(
                %camera_type,
                discarded = self.stats.frames_discarded,
                "dropping stale frame"
            );
        }
    }

    /// Counters since construction.
    pub fn stats(&self) -> ClientStats {
        self.stats
    }

    /// Current client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Toggle subscribe-latest for subsequent reads.
    pub fn set_subscribe_latest(&mut self, subscribe_latest: bool) {
        self.config.subscribe_latest = subscribe_latest;
    }

    /// Current scratch buffer capacity.
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the client and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn report<R>(result: Result<R, ReadError>) -> Option<R> {
    match result {
        Ok(frame) => Some(frame),
        Err(err) if err.is_expected() => {
            trace!(%err, "no frame");
            None
        }
        Err(err) => {
            warn!(%err, "frame read failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use imgshm_transport::{MemoryQueue, PacketSink, TransportConfig};

    use super::*;
    use crate::envelope::{ImageAvailable, MSG_ID_IMAGE_AVAILABLE};
    use crate::image::{ImageView, PixelFormat};
    use crate::layout::{encode_dual, encode_probe, encode_single};

    fn image_available() -> Envelope {
        Envelope::image_available(&ImageAvailable {
            timestamp: 42,
            ..ImageAvailable::default()
        })
    }

    fn queue() -> MemoryQueue {
        MemoryQueue::with_config(&TransportConfig {
            queue_depth: 64,
            ..TransportConfig::default()
        })
    }

    fn push_mono(queue: &mut MemoryQueue, camera_type: CameraType, fill: u8) {
        let pixels = vec![fill; 4 * 6];
        let view = ImageView::new(4, 6, PixelFormat::MONO8, 6, &pixels).unwrap();
        let mut buf = BytesMut::new();
        encode_probe(camera_type, &mut buf);
        queue.write_packet(&buf).unwrap();
        buf.clear();
        encode_single(camera_type, &view, &mut buf).unwrap();
        queue.write_packet(&buf).unwrap();
    }

    fn push_dual(queue: &mut MemoryQueue, camera_type: CameraType, fill: u8) {
        let first = vec![fill; 2 * 9];
        let second = vec![fill.wrapping_add(1); 2 * 6];
        let a = ImageView::new(2, 3, PixelFormat::BGR8, 9, &first).unwrap();
        let b = ImageView::new(2, 3, PixelFormat::MONO16, 6, &second).unwrap();
        let mut buf = BytesMut::new();
        encode_probe(camera_type, &mut buf);
        queue.write_packet(&buf).unwrap();
        buf.clear();
        encode_dual(camera_type, &a, &b, &mut buf).unwrap();
        queue.write_packet(&buf).unwrap();
    }

    #[test]
    fn reads_mono_frame() {
        let mut q = queue();
        push_mono(&mut q, CameraType::Mono8, 7);

        let mut client = ImageClient::new(q);
        let frame = client.read_mono(&image_available()).unwrap();
        assert_eq!(frame.camera_type, CameraType::Mono8);
        assert_eq!(frame.image.rows(), 4);
        assert_eq!(frame.image.columns(), 6);
        assert!(frame.image.data().iter().all(|&b| b == 7));
        assert!(client.get_ref().is_empty());
        assert_eq!(client.stats().frames_delivered, 1);
    }

    #[test]
    fn reads_stereo_and_paired_frames() {
        let mut q = queue();
        push_dual(&mut q, CameraType::Stereo24, 1);
        push_dual(&mut q, CameraType::PairedModality, 5);

        let mut client = ImageClient::new(q);
        let stereo = client.read_stereo(&image_available()).unwrap();
        assert_eq!(stereo.camera_type, CameraType::Stereo24);
        assert!(stereo.left.data().iter().all(|&b| b == 1));
        assert!(stereo.right.data().iter().all(|&b| b == 2));

        let paired = client.read_paired(&image_available()).unwrap();
        assert_eq!(paired.color.pixel_format(), PixelFormat::BGR8);
        assert_eq!(paired.depth.pixel_format(), PixelFormat::MONO16);
        assert!(paired.depth.data().iter().all(|&b| b == 6));
    }

    #[test]
    fn non_image_envelope_does_not_touch_transport() {
        let mut q = queue();
        push_mono(&mut q, CameraType::Mono8, 1);

        let mut client = ImageClient::new(q);
        let heartbeat = Envelope::new(0, Vec::<u8>::new());
        let err = client.try_read_mono(&heartbeat).unwrap_err();
        assert!(matches!(err, ReadError::NotAnImageMessage { msg_id: 0 }));
        assert!(client.read_mono(&heartbeat).is_none());
        assert_eq!(client.get_ref().len(), 2);
        assert_eq!(client.stats(), ClientStats::default());
    }

    #[test]
    fn empty_transport_fails_immediately() {
        let mut client = ImageClient::new(queue());
        let envelope = image_available();
        assert!(matches!(
            client.try_read_mono(&envelope),
            Err(ReadError::NoDataQueued)
        ));
        assert!(client.read_stereo(&envelope).is_none());
        assert!(client.read_paired(&envelope).is_none());
    }

    #[test]
    fn stereo_reader_rejects_mono_and_paired_tags() {
        for camera_type in [CameraType::Mono8, CameraType::Mono24] {
            let mut q = queue();
            push_mono(&mut q, camera_type, 3);
            let mut client = ImageClient::new(q);
            let err = client.try_read_stereo(&image_available()).unwrap_err();
            assert!(matches!(
                err,
                ReadError::UnexpectedCameraType {
                    expected: Modality::Stereo,
                    actual
                } if actual == camera_type
            ));
        }

        let mut q = queue();
        push_dual(&mut q, CameraType::PairedModality, 3);
        let mut client = ImageClient::new(q);
        assert!(client.read_stereo(&image_available()).is_none());
        assert_eq!(client.stats().reads_failed, 1);
    }

    #[test]
    fn mono_and_paired_readers_reject_other_modalities() {
        let mut q = queue();
        push_dual(&mut q, CameraType::Stereo8, 3);
        let mut client = ImageClient::new(q);
        assert!(client.read_mono(&image_available()).is_none());

        let mut q = queue();
        push_dual(&mut q, CameraType::Stereo8, 3);
        let mut client = ImageClient::new(q);
        assert!(client.read_paired(&image_available()).is_none());

        let mut q = queue();
        q.write_packet(&77u32.to_le_bytes()).unwrap();
        let mut client = ImageClient::new(q);
        let err = client.try_read_mono(&image_available()).unwrap_err();
        assert!(matches!(
            err,
            ReadError::UnexpectedCameraType {
                actual: CameraType::Unknown(77),
                ..
            }
        ));
    }

    #[test]
    fn subscribe_latest_returns_newest_and_drains_queue() {
        let mut q = queue();
        for fill in 1..=5u8 {
            push_mono(&mut q, CameraType::Mono8, fill);
        }

        let mut client = ImageClient::with_config(
            q,
            ClientConfig {
                subscribe_latest: true,
                ..ClientConfig::default()
            },
        );
        let frame = client.read_mono(&image_available()).unwrap();
        assert!(frame.image.data().iter().all(|&b| b == 5));
        assert!(client.get_ref().is_empty());

        let stats = client.stats();
        assert_eq!(stats.frames_delivered, 1);
        assert_eq!(stats.frames_discarded, 4);
    }

    struct NoSizeHint(MemoryQueue);

    impl PacketTransport for NoSizeHint {
        fn bytes_waiting(&self) -> bool {
            !self.0.is_empty()
        }

        fn read_packet(&mut self, buf: &mut [u8]) -> imgshm_transport::Result<usize> {
            self.0.read_packet(buf)
        }
    }

    #[test]
    fn frame_larger_than_scratch_without_size_hint_is_inconsistent() {
        let mut q = queue();
        let pixels = vec![1u8; 64 * 64];
        let view = ImageView::new(64, 64, PixelFormat::MONO8, 64, &pixels).unwrap();
        let mut buf = BytesMut::new();
        encode_probe(CameraType::Mono8, &mut buf);
        q.write_packet(&buf).unwrap();
        buf.clear();
        encode_single(CameraType::Mono8, &view, &mut buf).unwrap();
        q.write_packet(&buf).unwrap();
        push_mono(&mut q, CameraType::Mono8, 2);

        let mut client = ImageClient::with_config(
            NoSizeHint(q),
            ClientConfig {
                scratch_capacity: 100,
                ..ClientConfig::default()
            },
        );
        let err = client.try_read_mono(&image_available()).unwrap_err();
        assert!(matches!(
            err,
            ReadError::Packet(PacketError::InconsistentLength {
                declared: 4116,
                actual: 100
            })
        ));
        assert_eq!(client.scratch_capacity(), 100);

        let frame = client.try_read_mono(&image_available()).unwrap();
        assert!(frame.image.data().iter().all(|&b| b == 2));
    }

    #[test]
    fn paired_reader_rejects_mono_tags() {
        for camera_type in [CameraType::Mono8, CameraType::Mono24] {
            let mut q = queue();
            push_mono(&mut q, camera_type, 4);
            let mut client = ImageClient::new(q);
            let err = client.try_read_paired(&image_available()).unwrap_err();
            assert!(matches!(
                err,
                ReadError::UnexpectedCameraType {
                    expected: Modality::PairedModality,
                    actual
                } if actual == camera_type
            ));
            assert!(client.get_ref().is_empty());
        }
    }

    #[test]
    fn rejected_modality_keeps_channel_aligned() {
        let mut q = queue();
        push_dual(&mut q, CameraType::Stereo8, 3);
        push_mono(&mut q, CameraType::Mono24, 9);

        let mut client = ImageClient::new(q);
        assert!(matches!(
            client.try_read_mono(&image_available()),
            Err(ReadError::UnexpectedCameraType {
                actual: CameraType::Stereo8,
                ..
            })
        ));
        assert_eq!(client.get_ref().len(), 2);

        let frame = client.try_read_mono(&image_available()).unwrap();
        assert_eq!(frame.camera_type, CameraType::Mono24);
        assert!(frame.image.data().iter().all(|&b| b == 9));
    }

    #[test]
    fn without_subscribe_latest_returns_oldest_and_keeps_rest() {
        let mut q = queue();
        for fill in 1..=3u8 {
            push_mono(&mut q, CameraType::Mono8, fill);
        }

        let mut client = ImageClient::new(q);
        let frame = client.read_mono(&image_available()).unwrap();
        assert!(frame.image.data().iter().all(|&b| b == 1));
        assert_eq!(client.get_ref().len(), 4);

        let frame = client.read_mono(&image_available()).unwrap();
        assert!(frame.image.data().iter().all(|&b| b == 2));
        assert_eq!(client.stats().frames_discarded, 0);
    }

    #[test]
    fn failure_mid_drain_discards_earlier_frames() {
        let mut q = queue();
        push_mono(&mut q, CameraType::Mono8, 1);
        // Probe announces mono, data packet lies about its length.
        q.write_packet(&0u32.to_le_bytes()).unwrap();
        let mut bad = BytesMut::new();
        let pixels = [0u8; 4];
        let view = ImageView::new(2, 2, PixelFormat::MONO8, 2, &pixels).unwrap();
        encode_single(CameraType::Mono8, &view, &mut bad).unwrap();
        bad.truncate(bad.len() - 1);
        q.write_packet(&bad).unwrap();
        push_mono(&mut q, CameraType::Mono8, 3);

        let mut client = ImageClient::with_config(
            q,
            ClientConfig {
                subscribe_latest: true,
                ..ClientConfig::default()
            },
        );
        let err = client.try_read_mono(&image_available()).unwrap_err();
        assert!(matches!(
            err,
            ReadError::Packet(PacketError::InconsistentLength { .. })
        ));
        assert_eq!(client.stats().frames_delivered, 0);
        assert_eq!(client.stats().frames_discarded, 1);

        // The next call resumes at the following frame.
        let frame = client.read_mono(&image_available()).unwrap();
        assert!(frame.image.data().iter().all(|&b| b == 3));
    }

    #[test]
    fn zero_row_frame_is_delivered() {
        let mut q = queue();
        let pixels: [u8; 0] = [];
        let view = ImageView::new(0, 8, PixelFormat::MONO8, 8, &pixels).unwrap();
        let mut buf = BytesMut::new();
        encode_probe(CameraType::Mono8, &mut buf);
        q.write_packet(&buf).unwrap();
        buf.clear();
        encode_single(CameraType::Mono8, &view, &mut buf).unwrap();
        q.write_packet(&buf).unwrap();

        let mut client = ImageClient::new(q);
        let frame = client.read_mono(&image_available()).unwrap();
        assert_eq!(frame.image.rows(), 0);
        assert_eq!(frame.image.columns(), 8);
    }

    #[test]
    fn scratch_grows_for_large_frames() {
        let mut q = queue();
        let pixels = vec![9u8; 64 * 64];
        let view = ImageView::new(64, 64, PixelFormat::MONO8, 64, &pixels).unwrap();
        let mut buf = BytesMut::new();
        encode_probe(CameraType::Mono8, &mut buf);
        q.write_packet(&buf).unwrap();
        buf.clear();
        encode_single(CameraType::Mono8, &view, &mut buf).unwrap();
        q.write_packet(&buf).unwrap();

        let mut client = ImageClient::with_config(
            q,
            ClientConfig {
                scratch_capacity: 256,
                ..ClientConfig::default()
            },
        );
        let frame = client.read_mono(&image_available()).unwrap();
        assert_eq!(frame.image.data().len(), 64 * 64);
        assert_eq!(client.scratch_capacity(), 20 + 64 * 64);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut q = queue();
        push_mono(&mut q, CameraType::Mono8, 1);

        let mut client = ImageClient::with_config(
            q,
            ClientConfig {
                scratch_capacity: 8,
                max_packet_size: 16,
                ..ClientConfig::default()
            },
        );
        let err = client.try_read_mono(&image_available()).unwrap_err();
        assert!(matches!(
            err,
            ReadError::PacketTooLarge { size: 44, max: 16 }
        ));
        assert!(client.get_ref().is_empty());
    }

    #[test]
    fn envelope_id_constant_matches_notification() {
        assert_eq!(image_available().msg_id, MSG_ID_IMAGE_AVAILABLE);
    }
}
