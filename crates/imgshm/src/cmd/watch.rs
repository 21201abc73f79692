use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use imgshm_packet::{ClientConfig, Envelope, ImageClient, ReadError, ENVELOPE_HEADER_SIZE};
use imgshm_transport::{DatagramSocket, TransportConfig, CAMERA_FORWARD_LEFT};
use tracing::{debug, info, warn};

use crate::cmd::{notify_path, parse_duration, FrameKind, WatchArgs};
use crate::exit::{read_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{print_frame, FrameReport, OutputFormat};

/// How long one notification wait blocks before checking for Ctrl-C.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let deadline = match args.timeout.as_deref() {
        Some(raw) => Some(parse_duration(raw)?),
        None => None,
    };

    let config = TransportConfig::client(CAMERA_FORWARD_LEFT);
    let data = DatagramSocket::open(&args.path, &config)
        .map_err(|err| transport_error("bind failed", err))?;
    let notify = DatagramSocket::open(notify_path(&args.path), &config)
        .map_err(|err| transport_error("bind failed", err))?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|err| CliError::new(INTERNAL, format!("failed to install signal handler: {err}")))?;

    let mut client = ImageClient::with_config(
        data,
        ClientConfig {
            subscribe_latest: args.latest,
            ..ClientConfig::default()
        },
    );
    info!(path = %args.path.display(), kind = ?args.kind, "watching for frames");

    let mut envelope_buf = vec![0u8; ENVELOPE_HEADER_SIZE + 256];
    let mut received = 0u64;
    let mut last_frame = Instant::now();

    while !stop.load(Ordering::SeqCst) {
        if args.count.is_some_and(|count| received >= count) {
            break;
        }
        if let Some(window) = deadline {
            if last_frame.elapsed() >= window {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no frame received within {}ms", window.as_millis()),
                ));
            }
        }

        let len = match notify.recv_timeout(&mut envelope_buf, POLL_INTERVAL) {
            Ok(Some(len)) => len,
            Ok(None) => continue,
            Err(err) => return Err(transport_error("notification receive failed", err)),
        };
        let envelope = match Envelope::decode(&envelope_buf[..len]) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "dropping malformed notification");
                continue;
            }
        };

        match read_frame(&mut client, args.kind, &envelope, received, format) {
            Ok(()) => {
                received += 1;
                last_frame = Instant::now();
            }
            Err(err) if err.is_expected() => debug!(error = %err, "no frame for notification"),
            Err(err) if args.strict => return Err(read_error("frame rejected", err)),
            Err(err) => warn!(error = %err, "frame rejected"),
        }
    }

    let stats = client.stats();
    info!(
        delivered = stats.frames_delivered,
        discarded = stats.frames_discarded,
        failed = stats.reads_failed,
        "watch finished"
    );
    Ok(SUCCESS)
}

fn read_frame(
    client: &mut ImageClient<DatagramSocket>,
    kind: FrameKind,
    envelope: &Envelope,
    sequence: u64,
    format: OutputFormat,
) -> Result<(), ReadError> {
    let timestamp = envelope.timestamp();
    match kind {
        FrameKind::Mono => {
            let frame = client.try_read_mono(envelope)?;
            print_frame(
                &FrameReport {
                    sequence,
                    camera_type: frame.camera_type,
                    timestamp,
                    images: vec![("image", &frame.image)],
                    stats: client.stats(),
                },
                format,
            );
        }
        FrameKind::Stereo => {
            let frame = client.try_read_stereo(envelope)?;
            print_frame(
                &FrameReport {
                    sequence,
                    camera_type: frame.camera_type,
                    timestamp,
                    images: vec![("left", &frame.left), ("right", &frame.right)],
                    stats: client.stats(),
                },
                format,
            );
        }
        FrameKind::Paired => {
            let frame = client.try_read_paired(envelope)?;
            print_frame(
                &FrameReport {
                    sequence,
                    camera_type: frame.camera_type,
                    timestamp,
                    images: vec![("color", &frame.color), ("depth", &frame.depth)],
                    stats: client.stats(),
                },
                format,
            );
        }
    }
    Ok(())
}
