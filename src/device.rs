//! デバイス接続の簡易検出
//!
//! OS のデバイス一覧コマンドの出力をキーワードで探すだけのヒューリスティック。
//! 検出できなくても「未接続」として返すだけで、処理を止めるかは呼び出し側が決める。

use phoenix_common::match_device_text;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub connected: bool,
    pub detail: String,
}

impl DeviceStatus {
    pub fn summary(&self) -> String {
        format!(
            "Device: {}  |  {}",
            if self.connected { "Connected" } else { "Not Detected" },
            self.detail
        )
    }
}

#[cfg(windows)]
fn listing_command() -> (&'static str, &'static [&'static str]) {
    ("wmic", &["path", "Win32_PnPEntity", "get", "Name"])
}

#[cfg(target_os = "macos")]
fn listing_command() -> (&'static str, &'static [&'static str]) {
    ("system_profiler", &["SPUSBDataType"])
}

#[cfg(not(any(windows, target_os = "macos")))]
fn listing_command() -> (&'static str, &'static [&'static str]) {
    ("lsusb", &[])
}

/// デバイス検出の差し替え口
pub trait DeviceProbe: Send {
    fn probe(&self, tool_available: bool) -> DeviceStatus;
}

/// OS のコマンドで調べる既定の実装
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl DeviceProbe for SystemProbe {
    fn probe(&self, tool_available: bool) -> DeviceStatus {
        probe_device(tool_available)
    }
}

/// デバイスを探す。`tool_available` は未検出時の説明文にだけ使う
pub fn probe_device(tool_available: bool) -> DeviceStatus {
    let (program, args) = listing_command();

    match run_with_timeout(program, args, PROBE_TIMEOUT) {
        Some(listing) => {
            log::debug!("{} returned {} bytes", program, listing.len());
            status_from_listing(&listing, tool_available)
        }
        None => status_from_listing("", tool_available),
    }
}

/// 一覧テキストから状態を判定
pub fn status_from_listing(listing: &str, tool_available: bool) -> DeviceStatus {
    if let Some(keyword) = match_device_text(listing) {
        return DeviceStatus {
            connected: true,
            detail: format!("Possible device detected via USB scan ({})", keyword),
        };
    }

    let detail = if tool_available {
        "No device found, but tools detected"
    } else {
        "No device or tools detected"
    };
    DeviceStatus {
        connected: false,
        detail: detail.to_string(),
    }
}

/// コマンドを実行して標準出力を返す（失敗・タイムアウトは None）
fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            log::debug!("device probe {} unavailable: {}", program, e);
            return None;
        }
    };

    let mut stdout = child.stdout.take()?;
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let result = stdout.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(buf)) => {
            let _ = child.wait();
            Some(String::from_utf8_lossy(&buf).into_owned())
        }
        Ok(Err(e)) => {
            log::debug!("device probe read failed: {}", e);
            let _ = child.kill();
            let _ = child.wait();
            None
        }
        Err(_) => {
            log::debug!("device probe {} timed out", program);
            let _ = child.kill();
            let _ = child.wait();
            None
        }
    }
}
