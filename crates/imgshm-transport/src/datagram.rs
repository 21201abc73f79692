use std::io::ErrorKind;
use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{Role, TransportConfig};
use crate::error::{Result, TransportError};
use crate::traits::{PacketSink, PacketTransport};

/// Unix datagram socket packet transport.
///
/// Each datagram carries exactly one packet, so packet boundaries survive the
/// kernel hop without any extra framing. The consumer binds a filesystem path;
/// the producer connects to it. The bound path is removed on drop.
pub struct DatagramSocket {
    socket: UnixDatagram,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
    /// Whether the path should be removed on drop (bound sockets only).
    cleanup_on_drop: bool,
    payload_capacity: usize,
}

impl DatagramSocket {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Open the socket for `config.role`: clients bind `path`, servers connect to it.
    pub fn open(path: impl AsRef<Path>, config: &TransportConfig) -> Result<Self> {
        let mut socket = match config.role {
            Role::Client => Self::bind(path)?,
            Role::Server => Self::connect(path)?,
        };
        socket.set_payload_capacity(config.payload_capacity);
        Ok(socket)
    }

    /// Bind a consumer socket at `path`.
    ///
    /// If the file already exists and is a socket, it is removed first (stale
    /// socket cleanup).
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    /// Bind a consumer socket at `path` with explicit mode.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_path_len(&path, Self::MAX_PATH_LEN)?;

        // Remove stale socket if it exists, but never remove non-socket files.
        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| bind_error(&path, e))?;
            if metadata.file_type().is_socket() {
                debug!(?path, "removing stale socket");
                std::fs::remove_file(&path).map_err(|e| bind_error(&path, e))?;
            } else {
                return Err(bind_error(
                    &path,
                    std::io::Error::new(
                        ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                ));
            }
        }

        let socket = UnixDatagram::bind(&path).map_err(|e| bind_error(&path, e))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(|e| bind_error(&path, e))?;
        let created = std::fs::symlink_metadata(&path).map_err(|e| bind_error(&path, e))?;

        info!(?path, "bound image datagram socket");

        Ok(Self {
            socket,
            created_inode: Some((created.dev(), created.ino())),
            path,
            cleanup_on_drop: true,
            payload_capacity: TransportConfig::default().payload_capacity,
        })
    }

    /// Connect a producer socket to a bound consumer at `path`.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_path_len(&path, Self::MAX_PATH_LEN)?;

        let socket = UnixDatagram::unbound().map_err(|e| connect_error(&path, e))?;
        socket.connect(&path).map_err(|e| connect_error(&path, e))?;
        debug!(?path, "connected image datagram socket");

        Ok(Self {
            socket,
            path,
            created_inode: None,
            cleanup_on_drop: false,
            payload_capacity: TransportConfig::default().payload_capacity,
        })
    }

    /// The path this socket is bound or connected to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Maximum packet size accepted by `write_packet`.
    pub fn payload_capacity(&self) -> usize {
        self.payload_capacity
    }

    /// Update the packet size limit and ask the kernel for matching buffers.
    ///
    /// The kernel may clamp the socket buffers below `capacity`; sends larger
    /// than the clamped size then fail with an I/O error.
    pub fn set_payload_capacity(&mut self, capacity: usize) {
        self.payload_capacity = capacity;
        let size = libc::c_int::try_from(capacity).unwrap_or(libc::c_int::MAX);
        for option in [libc::SO_SNDBUF, libc::SO_RCVBUF] {
            // SAFETY: `size` is a valid c_int that outlives the call and the
            // descriptor is an open socket owned by `self.socket`.
            let rc = unsafe {
                libc::setsockopt(
                    self.socket.as_raw_fd(),
                    libc::SOL_SOCKET,
                    option,
                    (&size as *const libc::c_int).cast::<libc::c_void>(),
                    std::mem::size_of::<libc::c_int>() as libc::socklen_t,
                )
            };
            if rc != 0 {
                debug!(
                    option,
                    error = %std::io::Error::last_os_error(),
                    "socket buffer resize refused"
                );
            }
        }
    }

    /// Wait up to `timeout` for one packet.
    ///
    /// Returns `Ok(None)` when the timeout elapses with nothing received.
    pub fn recv_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>> {
        self.socket.set_read_timeout(Some(timeout))?;
        let received = self.socket.recv(buf);
        self.socket.set_read_timeout(None)?;
        match received {
            Ok(n) => Ok(Some(n)),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    /// Peek at the next datagram without consuming it.
    ///
    /// On Linux `MSG_TRUNC` makes the kernel report the full datagram length;
    /// elsewhere only presence is reliable.
    fn peek_len(&self) -> Option<usize> {
        #[cfg(target_os = "linux")]
        let flags = libc::MSG_PEEK | libc::MSG_DONTWAIT | libc::MSG_TRUNC;
        #[cfg(not(target_os = "linux"))]
        let flags = libc::MSG_PEEK | libc::MSG_DONTWAIT;

        let mut byte = 0u8;
        // SAFETY: `byte` is a valid one-byte writable buffer and the descriptor is
        // an open socket owned by `self.socket`.
        let rc = unsafe {
            libc::recv(
                self.socket.as_raw_fd(),
                (&mut byte as *mut u8).cast::<libc::c_void>(),
                1,
                flags,
            )
        };
        usize::try_from(rc).ok()
    }
}

impl PacketTransport for DatagramSocket {
    fn bytes_waiting(&self) -> bool {
        self.peek_len().is_some()
    }

    fn next_packet_len(&self) -> Option<usize> {
        if cfg!(target_os = "linux") {
            self.peek_len()
        } else {
            None
        }
    }

    fn read_packet(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.bytes_waiting() {
            return Ok(0);
        }
        loop {
            match self.socket.recv(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl PacketSink for DatagramSocket {
    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        if packet.len() > self.payload_capacity {
            return Err(TransportError::PacketTooLarge {
                size: packet.len(),
                capacity: self.payload_capacity,
            });
        }
        loop {
            match self.socket.send(packet) {
                Ok(n) if n == packet.len() => return Ok(()),
                Ok(n) => {
                    return Err(TransportError::Io(std::io::Error::new(
                        ErrorKind::WriteZero,
                        format!("datagram truncated ({n} of {} bytes sent)", packet.len()),
                    )))
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl Drop for DatagramSocket {
    fn drop(&mut self) {
        if self.cleanup_on_drop {
            if let Some((expected_dev, expected_ino)) = self.created_inode {
                if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
                    if metadata.file_type().is_socket()
                        && metadata.dev() == expected_dev
                        && metadata.ino() == expected_ino
                    {
                        debug!(path = ?self.path, "cleaning up socket file");
                        let _ = std::fs::remove_file(&self.path);
                    } else {
                        debug!(
                            path = ?self.path,
                            "socket path identity changed; skipping cleanup"
                        );
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for DatagramSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramSocket")
            .field("path", &self.path)
            .field("bound", &self.cleanup_on_drop)
            .field("payload_capacity", &self.payload_capacity)
            .finish()
    }
}

fn check_path_len(path: &Path, max: usize) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= max {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max,
        });
    }
    Ok(())
}

fn bind_error(path: &Path, source: std::io::Error) -> TransportError {
    TransportError::Bind {
        path: path.to_path_buf(),
        source,
    }
}

fn connect_error(path: &Path, source: std::io::Error) -> TransportError {
    TransportError::Connect {
        path: path.to_path_buf(),
        source,
    }
}
