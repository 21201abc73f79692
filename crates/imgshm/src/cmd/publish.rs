use std::time::{SystemTime, UNIX_EPOCH};

use bytes::BytesMut;
use imgshm_packet::layout::{dual_packet_len, single_packet_len};
use imgshm_packet::{CameraType, Envelope, ImageAvailable, ImagePublisher, ImageView, PixelFormat};
use imgshm_transport::{DatagramSocket, PacketSink, TransportConfig, CAMERA_FORWARD_LEFT};
use tracing::{debug, info};

use crate::cmd::{notify_path, parse_duration, FrameKind, PublishArgs};
use crate::exit::{publish_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_published, OutputFormat};

/// Frames stay valid for this long after their timestamp.
const VALIDITY_US: u64 = 50_000;

pub fn run(args: PublishArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let config = TransportConfig::server(CAMERA_FORWARD_LEFT);

    let data = DatagramSocket::open(&args.path, &config)
        .map_err(|err| transport_error("connect failed", err))?;
    let mut notify = DatagramSocket::open(notify_path(&args.path), &config)
        .map_err(|err| transport_error("connect failed", err))?;
    let mut publisher = ImagePublisher::new(data);

    let shape = FrameShape::new(args.kind, args.rows, args.columns)?;
    let mut envelope_buf = BytesMut::with_capacity(64);

    for sequence in 0..args.count {
        if sequence > 0 && !interval.is_zero() {
            std::thread::sleep(interval);
        }

        shape.publish(&mut publisher, sequence)?;

        let timestamp = now_micros();
        let envelope = Envelope::image_available(&ImageAvailable {
            cam_id: sequence,
            timestamp,
            valid_until: timestamp.saturating_add(VALIDITY_US),
            cam_no: 0,
            ..ImageAvailable::default()
        });
        envelope_buf.clear();
        envelope.encode(&mut envelope_buf);
        notify
            .write_packet(&envelope_buf)
            .map_err(|err| transport_error("notify failed", err))?;
        debug!(sequence, "frame announced");
    }

    info!(
        frames = publisher.published(),
        path = %args.path.display(),
        "publish complete"
    );
    print_published(
        &args.path.display().to_string(),
        shape.camera_type(),
        publisher.published(),
        shape.packet_size(),
        format,
    );
    Ok(SUCCESS)
}

/// Geometry of the synthetic frames.
struct FrameShape {
    kind: FrameKind,
    rows: u32,
    columns: u32,
}

impl FrameShape {
    fn new(kind: FrameKind, rows: u32, columns: u32) -> CliResult<Self> {
        if columns == 0 {
            return Err(CliError::new(USAGE, "--columns must be at least 1"));
        }
        Ok(Self {
            kind,
            rows,
            columns,
        })
    }

    fn camera_type(&self) -> CameraType {
        match self.kind {
            FrameKind::Mono => CameraType::Mono8,
            FrameKind::Stereo => CameraType::Stereo8,
            FrameKind::Paired => CameraType::PairedModality,
        }
    }

    /// Stride of the first image and, for dual layouts, the second.
    fn strides(&self) -> (u32, u32) {
        match self.kind {
            FrameKind::Mono | FrameKind::Stereo => (self.columns, self.columns),
            FrameKind::Paired => (
                self.columns.saturating_mul(3),
                self.columns.saturating_mul(2),
            ),
        }
    }

    fn packet_size(&self) -> usize {
        let (first, second) = self.strides();
        let len = match self.kind {
            FrameKind::Mono => single_packet_len(self.rows, first),
            FrameKind::Stereo | FrameKind::Paired => dual_packet_len(self.rows, first, second),
        };
        usize::try_from(len).unwrap_or(usize::MAX)
    }

    fn publish<T: PacketSink>(
        &self,
        publisher: &mut ImagePublisher<T>,
        sequence: u64,
    ) -> CliResult<()> {
        let (first_stride, second_stride) = self.strides();
        let first = pattern(self.rows, first_stride, sequence);
        let second = pattern(self.rows, second_stride, sequence.wrapping_add(128));
        let result = match self.kind {
            FrameKind::Mono => {
                let image = self.view(PixelFormat::MONO8, first_stride, &first)?;
                publisher.publish_mono(CameraType::Mono8, &image)
            }
            FrameKind::Stereo => {
                let left = self.view(PixelFormat::MONO8, first_stride, &first)?;
                let right = self.view(PixelFormat::MONO8, second_stride, &second)?;
                publisher.publish_stereo(CameraType::Stereo8, &left, &right)
            }
            FrameKind::Paired => {
                let color = self.view(PixelFormat::BGR8, first_stride, &first)?;
                let depth = self.view(PixelFormat::MONO16, second_stride, &second)?;
                publisher.publish_paired(&color, &depth)
            }
        };
        result.map_err(|err| publish_error("publish failed", err))
    }

    fn view<'a>(
        &self,
        format: PixelFormat,
        stride: u32,
        data: &'a [u8],
    ) -> CliResult<ImageView<'a>> {
        ImageView::new(self.rows, self.columns, format, stride, data)
            .map_err(|err| CliError::new(USAGE, format!("invalid frame geometry: {err}")))
    }
}

/// Deterministic test pattern so consumers can spot torn frames.
fn pattern(rows: u32, stride: u32, seed: u64) -> Vec<u8> {
    let len = rows as usize * stride as usize;
    (0..len)
        .map(|i| (seed as usize).wrapping_add(i) as u8)
        .collect()
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
