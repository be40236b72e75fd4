//! バックグラウンド実行モジュール
//!
//! 1アクション = 1ワーカー（spawn_blocking）。ワーカー内でツールを順番に起動し、
//! 出力行をログファイルへ追記しながらチャネルで表示側へ中継する。
//! ステップ N の出力を読み切ってからステップ N+1 を起動する。

use crate::cancel::CancelToken;
use crate::error::{PhoenixError, Result};
use crate::tool::{MtkTool, ToolOutput};
use phoenix_common::{
    FailurePolicy, FlashOperation, FlashSequence, LogRecord, RestoreMachine, RestoreState, Step,
};
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// ワーカーが実行する仕事
#[derive(Debug)]
pub enum Job {
    Flash(FlashOperation),
    Restore {
        sequence: FlashSequence,
        policy: FailurePolicy,
        /// 確認まで済んで Running になっている状態機械
        machine: RestoreMachine,
    },
    WipeUserdata,
    Reset,
    RebootBootloader,
}

/// 表示側へ送るイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Record(LogRecord),
    /// step は 1 始まり
    Progress { step: usize, total: usize },
}

/// 実行結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub log_path: Option<PathBuf>,
    pub failed_steps: usize,
    pub cancelled: bool,
    /// 一括復旧の最終状態
    pub restore_state: Option<RestoreState>,
}

/// 同時実行を防ぐフラグ
#[derive(Debug, Clone, Default)]
pub struct BusyFlag {
    flag: Arc<AtomicBool>,
}

impl BusyFlag {
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard {
                flag: self.flag.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// 破棄時にフラグを戻す
#[derive(Debug)]
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// ログファイルと表示側への中継
pub struct Relay {
    file: Option<LineWriter<File>>,
    path: Option<PathBuf>,
    tx: UnboundedSender<WorkerEvent>,
}

impl Relay {
    /// ログファイルを新規作成する。作れなければファイル無しで続行
    pub fn open(path: &Path, tx: UnboundedSender<WorkerEvent>) -> Self {
        let mut relay = Self {
            file: None,
            path: None,
            tx,
        };
        match create_fresh(path) {
            Ok((file, created)) => {
                relay.file = Some(LineWriter::new(file));
                relay.path = Some(created);
            }
            Err(e) => {
                log::warn!("could not create log file {}: {}", path.display(), e);
                relay.send(LogRecord::warn(format!(
                    "Could not create log file {} ({}); this run will not be saved.",
                    path.display(),
                    e
                )));
            }
        }
        relay
    }

    /// ファイルに書かず表示側へだけ送る
    pub fn without_file(tx: UnboundedSender<WorkerEvent>) -> Self {
        Self {
            file: None,
            path: None,
            tx,
        }
    }

    pub fn emit(&mut self, record: LogRecord) {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", record.text) {
                log::warn!("log write failed, disabling log file: {}", e);
                self.file = None;
                self.path = None;
            }
        }
        self.send(record);
    }

    pub fn progress(&mut self, step: usize, total: usize) {
        let _ = self.tx.send(WorkerEvent::Progress { step, total });
    }

    /// ログファイルを閉じてパスを返す
    pub fn close(&mut self) -> Option<PathBuf> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
        self.path.take()
    }

    fn send(&self, record: LogRecord) {
        // 表示側が先に終わっていても処理は続ける
        let _ = self.tx.send(WorkerEvent::Record(record));
    }
}

/// 既存のファイルには追記せず、同名があれば `_2`, `_3` … を付けて新規作成する
fn create_fresh(path: &Path) -> std::io::Result<(File, PathBuf)> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = path.to_path_buf();
    let mut n = 1;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((file, candidate)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && n < 100 => {
                n += 1;
                candidate = path.with_file_name(format!("{}_{}{}", stem, n, ext));
            }
            Err(e) => return Err(e),
        }
    }
}

/// 出力を最後まで読み、1行ずつ中継する
fn drain(output: &mut ToolOutput, relay: &mut Relay) {
    for line in output.by_ref() {
        relay.emit(LogRecord::from_tool(line));
    }
}

fn exit_detail(output: &ToolOutput) -> String {
    match output.exit_status().and_then(|s| s.code()) {
        Some(code) => format!("exit code {}", code),
        None if output.exit_status().is_some() => "terminated by signal".into(),
        None => "not started".into(),
    }
}

/// ジョブを同期的に実行する（ワーカースレッド内で呼ぶ）
pub fn run_job(job: Job, tool: &MtkTool, relay: &mut Relay, cancel: &CancelToken) -> JobReport {
    let mut report = match job {
        Job::Restore {
            sequence,
            policy,
            machine,
        } => run_restore(&sequence, policy, machine, tool, relay, cancel),
        Job::Flash(op) => {
            let file = op
                .image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            relay.emit(LogRecord::info(format!("Flashing {} from {} …", op.partition, file)));
            let output = tool.flash(&op, cancel);
            run_single(output, relay)
        }
        Job::WipeUserdata => {
            relay.emit(LogRecord::warn("Erasing userdata …"));
            run_single(tool.wipe_userdata(cancel), relay)
        }
        Job::Reset => {
            relay.emit(LogRecord::warn("Sending reset …"));
            run_single(tool.reset(cancel), relay)
        }
        Job::RebootBootloader => {
            relay.emit(LogRecord::warn("Rebooting (bootloader) …"));
            run_single(tool.reboot_bootloader(cancel), relay)
        }
    };

    report.log_path = relay.close();
    if let Some(path) = &report.log_path {
        relay.emit(LogRecord::warn(format!("Saved log to {}", path.display())));
    }
    report
}

fn run_single(mut output: ToolOutput, relay: &mut Relay) -> JobReport {
    drain(&mut output, relay);

    let mut report = JobReport {
        cancelled: output.was_cancelled(),
        ..Default::default()
    };
    if report.cancelled {
        relay.emit(LogRecord::warn("Cancelled; tool process stopped."));
    } else if !output.succeeded() {
        report.failed_steps = 1;
        if output.exit_status().is_some() {
            relay.emit(LogRecord::err(format!("mtk finished with {}", exit_detail(&output))));
        }
    }
    report
}

fn run_restore(
    sequence: &FlashSequence,
    policy: FailurePolicy,
    mut machine: RestoreMachine,
    tool: &MtkTool,
    relay: &mut Relay,
    cancel: &CancelToken,
) -> JobReport {
    let mut report = JobReport::default();
    let total = sequence.len();

    for notice in &sequence.notices {
        relay.emit(notice.clone());
    }

    for (index, step) in sequence.steps.iter().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        relay.progress(index + 1, total);
        let header = format!("[{}/{}] {}", index + 1, total, step.describe());
        let mut output = match step {
            Step::Flash(op) => {
                relay.emit(LogRecord::info(header));
                tool.flash(op, cancel)
            }
            Step::WipeUserdata => {
                relay.emit(LogRecord::warn(header));
                tool.wipe_userdata(cancel)
            }
        };
        drain(&mut output, relay);

        if output.was_cancelled() {
            report.cancelled = true;
            break;
        }

        if !output.succeeded() {
            report.failed_steps += 1;
            relay.emit(LogRecord::err(format!(
                "Step {}/{} failed ({})",
                index + 1,
                total,
                exit_detail(&output)
            )));
            if policy == FailurePolicy::Abort {
                let _ = machine.halt();
                relay.emit(LogRecord::err("Stopping restore: abort-on-failure is enabled."));
                break;
            }
        }

        if let Err(e) = machine.advance() {
            log::warn!("restore state machine out of step: {}", e);
        }
    }

    if report.cancelled {
        let _ = machine.halt();
        relay.emit(LogRecord::warn("Restore cancelled; remaining steps skipped."));
    }

    if machine.state() == RestoreState::Completed {
        let summary = if report.failed_steps == 0 {
            "Restore sequence complete.".to_string()
        } else {
            format!(
                "Restore sequence complete ({} of {} steps reported problems).",
                report.failed_steps, total
            )
        };
        relay.emit(LogRecord::ok(summary));
    }

    report.restore_state = Some(machine.state());
    report
}

/// 実行中ジョブのハンドル
pub struct JobHandle {
    pub events: UnboundedReceiver<WorkerEvent>,
    cancel: CancelToken,
    handle: JoinHandle<JobReport>,
}

impl JobHandle {
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// ワーカーの終了を待つ
    pub async fn join(self) -> Result<JobReport> {
        self.handle
            .await
            .map_err(|e| PhoenixError::Io(std::io::Error::other(e)))
    }
}

/// ジョブをワーカーで開始する。ガードはワーカー終了まで保持
pub fn spawn_job(job: Job, tool: MtkTool, log_path: PathBuf, busy: BusyGuard) -> JobHandle {
    let (tx, events) = unbounded_channel();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let handle = tokio::task::spawn_blocking(move || {
        let _busy = busy;
        let mut relay = Relay::open(&log_path, tx);
        run_job(job, &tool, &mut relay, &worker_cancel)
    });

    JobHandle {
        events,
        cancel,
        handle,
    }
}
