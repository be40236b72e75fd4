//! 外部ツールの出力を1行ずつ読み出すイテレータ
//!
//! stdout と stderr は同じパイプに繋ぐので、プロセスが書いた順に届く。
//! 最終行の後で必ず wait し、途中で破棄された場合も kill → wait で回収する。
//!
//! パイプは読み取りスレッドが読み、こちらはキャンセルを見ながら待つ。
//! 出力の無いツールでもキャンセルすればすぐに kill される。

use crate::cancel::CancelToken;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, ErrorKind, PipeReader};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// キャンセル確認の間隔
const CANCEL_POLL: Duration = Duration::from_millis(50);

type Line = io::Result<Vec<u8>>;

pub struct ToolOutput {
    child: Option<Child>,
    lines: Option<Receiver<Line>>,
    pending_error: Option<String>,
    cancel: CancelToken,
    status: Option<ExitStatus>,
    cancelled: bool,
}

impl ToolOutput {
    /// プロセスを起動する。起動できなければエラー行を1行だけ返すイテレータになる
    pub fn spawn<S: AsRef<OsStr>>(program: &Path, args: &[S], cancel: CancelToken) -> Self {
        let (reader, writer) = match std::io::pipe() {
            Ok(pair) => pair,
            Err(e) => return Self::failed(format!("ERROR: could not create output pipe: {}", e)),
        };
        let stderr = match writer.try_clone() {
            Ok(w) => w,
            Err(e) => return Self::failed(format!("ERROR: could not create output pipe: {}", e)),
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr);

        let spawned = command.spawn();
        // 親側の書き込み端を閉じないと EOF が来ない
        drop(command);

        match spawned {
            Ok(child) => {
                log::debug!("spawned {} (pid {})", program.display(), child.id());
                let (tx, rx) = mpsc::channel();
                std::thread::spawn(move || pump(reader, tx));
                Self {
                    child: Some(child),
                    lines: Some(rx),
                    pending_error: None,
                    cancel,
                    status: None,
                    cancelled: false,
                }
            }
            Err(e) => Self::failed(format!("ERROR: failed to launch {}: {}", program.display(), e)),
        }
    }

    /// エラー行を1行だけ返して終わる出力
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            child: None,
            lines: None,
            pending_error: Some(message.into()),
            cancel: CancelToken::new(),
            status: None,
            cancelled: false,
        }
    }

    /// 終了後の終了ステータス（起動失敗時は None）
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// 起動でき、正常終了したか
    pub fn succeeded(&self) -> bool {
        self.status.map(|s| s.success()).unwrap_or(false)
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    fn finish(&mut self, kill: bool) {
        self.lines = None;
        if let Some(mut child) = self.child.take() {
            if kill {
                if let Err(e) = child.kill() {
                    log::debug!("kill failed: {}", e);
                }
            }
            match child.wait() {
                Ok(status) => self.status = Some(status),
                Err(e) => log::warn!("failed to wait for tool process: {}", e),
            }
        }
    }
}

impl Iterator for ToolOutput {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if let Some(message) = self.pending_error.take() {
            return Some(message);
        }

        loop {
            self.lines.as_ref()?;
            if self.cancel.is_cancelled() {
                self.cancelled = true;
                self.finish(true);
                return None;
            }

            let received = self.lines.as_ref()?.recv_timeout(CANCEL_POLL);
            match received {
                Ok(Ok(mut buf)) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    return Some(String::from_utf8_lossy(&buf).into_owned());
                }
                Ok(Err(e)) => {
                    log::warn!("failed to read tool output: {}", e);
                    self.finish(false);
                    return None;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    self.finish(false);
                    return None;
                }
            }
        }
    }
}

/// パイプを1行ずつ読んで送る（EOF か受信側の破棄で終了）
fn pump(reader: PipeReader, tx: Sender<Line>) {
    let mut reader = BufReader::new(reader);
    loop {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(Ok(buf)).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.send(Err(e));
                break;
            }
        }
    }
}

impl Drop for ToolOutput {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.finish(true);
        }
    }
}
