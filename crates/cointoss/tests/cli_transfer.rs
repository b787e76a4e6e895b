#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use cointoss::transport::ChannelClient;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x01, 0x02];
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x03, 0x04];

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new(tag: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("cointoss-cli-{tag}-"))
            .tempdir_in("/tmp")
            .expect("temp dir should be creatable");
        std::fs::write(dir.path().join("heads.png"), PNG).expect("heads should be writable");
        std::fs::write(dir.path().join("tails.jpg"), JPEG).expect("tails should be writable");
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn spawn_listener(&self, count: usize, timeout: &str) -> Child {
        Command::new(env!("CARGO_BIN_EXE_cointoss"))
            .args(["--log-level", "error", "--format", "json", "listen"])
            .arg(self.path("link.sock"))
            .arg("--store")
            .arg(self.path("store"))
            .arg("--count")
            .arg(count.to_string())
            .arg("--timeout")
            .arg(timeout)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("listen command should start")
    }

    fn send(&self, name: &str) -> Output {
        Command::new(env!("CARGO_BIN_EXE_cointoss"))
            .args(["--log-level", "error", "--format", "json", "send"])
            .arg(self.path("link.sock"))
            .arg("--heads")
            .arg(self.path("heads.png"))
            .arg("--tails")
            .arg(self.path("tails.jpg"))
            .arg("--name")
            .arg(name)
            .output()
            .expect("send command should run")
    }
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        assert!(start.elapsed() < timeout, "listener did not bind in time");
        thread::sleep(Duration::from_millis(25));
    }
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        if child.try_wait().expect("child status").is_some() {
            return child.wait_with_output().expect("child output");
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            panic!("listener did not exit in time");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

#[test]
fn send_then_listen_installs_coin() {
    let fx = Fixture::new("e2e");
    let listener = fx.spawn_listener(1, "5s");
    wait_for_socket(&fx.path("link.sock"), Duration::from_secs(5));

    let sent = fx.send("Lucky Coin");
    assert!(
        sent.status.success(),
        "send failed: {}",
        String::from_utf8_lossy(&sent.stderr)
    );
    let sent_report = &json_lines(&sent.stdout)[0];
    assert_eq!(sent_report["name"], "Lucky Coin");
    assert_eq!(
        sent_report["frame_size"],
        12 + PNG.len() + JPEG.len() + "Lucky Coin".len()
    );

    let output = wait_with_timeout(listener, Duration::from_secs(10));
    assert!(output.status.success());

    let installed = &json_lines(&output.stdout)[0];
    assert_eq!(installed["name"], "Lucky Coin");
    assert!(installed["replaced"].is_null());
    assert!(installed["schema_id"]
        .as_str()
        .expect("schema_id should be a string")
        .ends_with("coin-installed.schema.json"));

    let heads = installed["heads"].as_str().expect("heads ref");
    let stored = std::fs::read(fx.path("store").join("images").join(heads))
        .expect("heads image should be stored");
    assert_eq!(stored, PNG);

    let repo: serde_json::Value = serde_json::from_slice(
        &std::fs::read(fx.path("store").join("coins.json")).expect("repository file"),
    )
    .expect("repository should be JSON");
    assert_eq!(repo["coin_type"], "custom");
    assert_eq!(repo["custom_coin"]["name"], "Lucky Coin");
}

#[test]
fn listener_survives_bad_channels_and_replaces_coin() {
    let fx = Fixture::new("recover");
    let sock_path = fx.path("link.sock");
    let listener = fx.spawn_listener(2, "5s");
    wait_for_socket(&sock_path, Duration::from_secs(5));

    // Wrong channel path: ignored.
    let other = ChannelClient::open(&sock_path, "/start-activity").expect("open other path");
    other.shutdown_write().expect("close other path");
    drop(other);

    // Truncated frame: dropped.
    let mut bad = ChannelClient::open(&sock_path, "/image").expect("open image path");
    bad.write_all(&[0, 0, 0, 9, 1, 2]).expect("write truncated frame");
    bad.shutdown_write().expect("close truncated frame");
    drop(bad);

    assert!(fx.send("First").status.success());
    assert!(fx.send("Second").status.success());

    let output = wait_with_timeout(listener, Duration::from_secs(10));
    assert!(output.status.success());

    let reports = json_lines(&output.stdout);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["name"], "First");
    assert_eq!(reports[1]["name"], "Second");
    assert_eq!(reports[1]["replaced"], "First");

    let images = std::fs::read_dir(fx.path("store").join("images"))
        .expect("images dir")
        .count();
    assert_eq!(images, 2, "replaced coin's images should be deleted");
}

#[test]
fn silent_peer_does_not_stall_listener() {
    let fx = Fixture::new("silent");
    let sock_path = fx.path("link.sock");
    let listener = fx.spawn_listener(1, "1s");
    wait_for_socket(&sock_path, Duration::from_secs(5));

    // Connects but never names a channel.
    let silent = UnixStream::connect(&sock_path).expect("raw connect");

    assert!(fx.send("After Silence").status.success());

    let output = wait_with_timeout(listener, Duration::from_secs(8));
    assert!(output.status.success());
    let reports = json_lines(&output.stdout);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["name"], "After Silence");
    drop(silent);
}

#[test]
fn send_to_missing_listener_fails() {
    let fx = Fixture::new("nolistener");
    let sent = fx.send("Lonely Coin");
    assert_eq!(sent.status.code(), Some(1));
}
