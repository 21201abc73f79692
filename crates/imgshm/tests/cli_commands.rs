#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/imgshm-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn wait_for_path(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() >= timeout {
            panic!("{} never appeared", path.display());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_imgshm"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("imgshm {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn watch_receives_published_stereo_frames() {
    let dir = unique_temp_dir("watch");
    let sock_path = dir.join("cam.sock");

    let child = Command::new(env!("CARGO_BIN_EXE_imgshm"))
        .args(["--log-level", "error", "--format", "json", "watch"])
        .arg(&sock_path)
        .args(["--kind", "stereo", "--count", "2", "--timeout", "5s"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("watch should start");

    wait_for_path(&dir.join("cam.sock.notify"), Duration::from_secs(3));

    let publish = Command::new(env!("CARGO_BIN_EXE_imgshm"))
        .args(["--log-level", "error", "--format", "json", "publish"])
        .arg(&sock_path)
        .args(["--kind", "stereo", "--count", "2", "--rows", "3", "--columns", "5"])
        .args(["--interval", "50ms"])
        .output()
        .expect("publish should run");
    assert!(publish.status.success());
    let published = String::from_utf8_lossy(&publish.stdout);
    assert!(published.contains("\"event\":\"published\""));
    assert!(published.contains("\"frames\":2"));

    let output = child.wait_with_output().expect("watch should exit");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let frames: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is json"))
        .collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["camera_type"], "STEREO_8");
    assert_eq!(frames[1]["images"][1]["role"], "right");
    assert_eq!(frames[1]["images"][1]["columns"], 5);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn strict_watch_exits_on_frame_of_wrong_kind() {
    let dir = unique_temp_dir("strict");
    let sock_path = dir.join("cam.sock");

    let child = Command::new(env!("CARGO_BIN_EXE_imgshm"))
        .args(["--log-level", "off", "--format", "json", "watch"])
        .arg(&sock_path)
        .args(["--kind", "stereo", "--strict", "--timeout", "5s"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("watch should start");

    wait_for_path(&dir.join("cam.sock.notify"), Duration::from_secs(3));

    let publish = Command::new(env!("CARGO_BIN_EXE_imgshm"))
        .args(["--log-level", "off", "--format", "json", "publish"])
        .arg(&sock_path)
        .args(["--kind", "mono"])
        .output()
        .expect("publish should run");
    assert!(publish.status.success());

    let output = child.wait_with_output().expect("watch should exit");
    assert_eq!(output.status.code(), Some(60));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("frame rejected"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn watch_without_publisher_times_out_with_124() {
    let dir = unique_temp_dir("timeout");
    let output = Command::new(env!("CARGO_BIN_EXE_imgshm"))
        .args(["--log-level", "off", "watch"])
        .arg(dir.join("cam.sock"))
        .args(["--timeout", "300ms"])
        .output()
        .expect("watch should run");

    assert_eq!(output.status.code(), Some(124));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn publish_to_missing_consumer_fails() {
    let dir = unique_temp_dir("missing");
    let output = Command::new(env!("CARGO_BIN_EXE_imgshm"))
        .args(["--log-level", "off", "publish"])
        .arg(dir.join("nobody.sock"))
        .output()
        .expect("publish should run");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("connect failed"));
    let _ = std::fs::remove_dir_all(&dir);
}
