use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod publish;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish synthetic camera frames to a watching consumer.
    Publish(PublishArgs),
    /// Bind a consumer socket and print received frames.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Publish(args) => publish::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Which frame shape to publish or expect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FrameKind {
    Mono,
    Stereo,
    Paired,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Data socket path of the consumer. Notifications go to `<PATH>.notify`.
    #[arg(env = "IMGSHM_SOCKET")]
    pub path: PathBuf,
    /// Frame shape to publish.
    #[arg(long, value_enum, default_value = "mono")]
    pub kind: FrameKind,
    /// Number of frames to publish.
    #[arg(long, default_value = "1")]
    pub count: u64,
    /// Image rows.
    #[arg(long, default_value = "4")]
    pub rows: u32,
    /// Image columns.
    #[arg(long, default_value = "8")]
    pub columns: u32,
    /// Delay between frames (e.g. 100ms, 1s).
    #[arg(long, default_value = "0ms")]
    pub interval: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Data socket path to bind. Notifications are read from `<PATH>.notify`.
    #[arg(env = "IMGSHM_SOCKET")]
    pub path: PathBuf,
    /// Frame shape to expect.
    #[arg(long, value_enum, default_value = "mono")]
    pub kind: FrameKind,
    /// Drain queued frames on every notification and keep only the newest.
    #[arg(long)]
    pub latest: bool,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<u64>,
    /// Give up when no frame arrives within this window (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
    /// Exit on the first rejected frame instead of logging it and moving on.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Path of the notification socket that pairs with a data socket.
pub fn notify_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".notify");
    PathBuf::from(name)
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let invalid = || CliError::new(USAGE, format!("invalid duration: {input}"));
    let (digits, scale) = if let Some(ms) = input.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(s) = input.strip_suffix('s') {
        (s, 1000)
    } else {
        (input, 1000)
    };
    let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
    let millis = value.checked_mul(scale).ok_or_else(invalid)?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("soon").unwrap_err().code, USAGE);
    }

    #[test]
    fn notify_path_appends_suffix() {
        assert_eq!(
            notify_path(Path::new("/tmp/cam.sock")),
            PathBuf::from("/tmp/cam.sock.notify")
        );
    }
}
