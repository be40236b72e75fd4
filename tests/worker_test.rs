//! ワーカーの結合テスト
//!
//! `sh -c` で mtk の代わりになるスクリプトを動かし、ステップ順・失敗時の扱い・
//! ログファイルの内容を検証

#![cfg(unix)]

use phoenix_common::{
    build_sequence, FailurePolicy, FirmwareMapping, LogLevel, LogRecord, PartitionKey, RestoreMachine,
    RestoreState, SequenceOptions, ToolVocabulary,
};
use phoenix_r1::cancel::CancelToken;
use phoenix_r1::error::PhoenixError;
use phoenix_r1::tool::{MtkTool, ToolCommand, ToolSource};
use phoenix_r1::worker::{run_job, Job, Relay, WorkerEvent};
use std::fs;
use tempfile::tempdir;
use tokio::sync::mpsc::unbounded_channel;

/// super の書き込みだけ失敗する偽ツール
const FAKE_MTK: &str = r#"echo "mtk $*"
if [ "$2" = "super" ]; then
  echo "Error: write failed" >&2
  exit 1
fi
echo "done""#;

fn fake_tool() -> MtkTool {
    let command = ToolCommand::new(
        "sh",
        vec!["-c".into(), FAKE_MTK.into(), "mtk".into()],
        ToolSource::Configured,
    );
    MtkTool::new(Ok(command), ToolVocabulary::default())
}

fn restore_job(policy: FailurePolicy) -> Job {
    let mapping = FirmwareMapping::from_paths([
        (PartitionKey::Boot, "/fw/boot.img"),
        (PartitionKey::Vbmeta, "/fw/vbmeta.img"),
        (PartitionKey::SuperOrSystem, "/fw/super.img"),
        (PartitionKey::Vendor, "/fw/vendor.img"),
    ]);
    let sequence = build_sequence(
        &mapping,
        SequenceOptions {
            skip_optional: false,
            wipe: true,
        },
    );
    let mut machine = RestoreMachine::new(sequence.len());
    machine.begin(true, true, true).unwrap();
    machine.confirm(true).unwrap();
    Job::Restore {
        sequence,
        policy,
        machine,
    }
}

fn records(rx: &mut tokio::sync::mpsc::UnboundedReceiver<WorkerEvent>) -> Vec<LogRecord> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let WorkerEvent::Record(record) = event {
            out.push(record);
        }
    }
    out
}

fn position(log: &str, needle: &str) -> usize {
    log.find(needle).unwrap_or_else(|| panic!("{:?} not in log:\n{}", needle, log))
}

/// 失敗しても続行し、消去は最後に実行される
#[test]
fn test_restore_continues_after_failure() {
    let dir = tempdir().expect("Failed to create temp dir");
    let log_path = dir.path().join("PhoenixR1_Log_test.txt");
    let (tx, mut rx) = unbounded_channel();
    let mut relay = Relay::open(&log_path, tx);

    let report = run_job(restore_job(FailurePolicy::Continue), &fake_tool(), &mut relay, &CancelToken::new());

    assert_eq!(report.failed_steps, 1);
    assert!(!report.cancelled);
    assert_eq!(report.restore_state, Some(RestoreState::Completed));
    assert_eq!(report.log_path.as_deref(), Some(log_path.as_path()));

    let log = fs::read_to_string(&log_path).unwrap();
    let order = [
        "[1/5] Flashing vbmeta",
        "mtk w vbmeta /fw/vbmeta.img",
        "mtk w boot /fw/boot.img",
        "mtk w super /fw/super.img",
        "Error: write failed",
        "Step 3/5 failed (exit code 1)",
        "mtk w vendor /fw/vendor.img",
        "[5/5] Erasing userdata",
        "mtk e userdata",
        "Restore sequence complete (1 of 5 steps reported problems).",
    ];
    let positions: Vec<usize> = order.iter().map(|needle| position(&log, needle)).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "unexpected order:\n{}", log);

    let relayed = records(&mut rx);
    let error_line = relayed.iter().find(|r| r.text == "Error: write failed").unwrap();
    assert_eq!(error_line.level, LogLevel::Err);
    let last = relayed.last().unwrap();
    assert!(last.text.starts_with("Saved log to"));
    assert!(!log.contains("Saved log to"));
}

/// 中断ポリシーでは失敗したステップで止まり、消去もしない
#[test]
fn test_restore_aborts_on_failure() {
    let dir = tempdir().expect("Failed to create temp dir");
    let log_path = dir.path().join("abort.txt");
    let (tx, _rx) = unbounded_channel();
    let mut relay = Relay::open(&log_path, tx);

    let report = run_job(restore_job(FailurePolicy::Abort), &fake_tool(), &mut relay, &CancelToken::new());

    assert_eq!(report.failed_steps, 1);
    assert_eq!(report.restore_state, Some(RestoreState::Aborted));

    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("mtk w super"));
    assert!(log.contains("Stopping restore"));
    assert!(!log.contains("mtk w vendor"));
    assert!(!log.contains("mtk e userdata"));
    assert!(!log.contains("Restore sequence complete"));
}

/// 開始前にキャンセル済みなら何も起動しない
#[test]
fn test_restore_cancelled_before_start() {
    let dir = tempdir().expect("Failed to create temp dir");
    let log_path = dir.path().join("cancel.txt");
    let (tx, _rx) = unbounded_channel();
    let mut relay = Relay::open(&log_path, tx);
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = run_job(restore_job(FailurePolicy::Continue), &fake_tool(), &mut relay, &cancel);

    assert!(report.cancelled);
    assert_eq!(report.restore_state, Some(RestoreState::Aborted));
    let log = fs::read_to_string(&log_path).unwrap();
    assert!(!log.contains("mtk w"));
    assert!(log.contains("Restore cancelled"));
}

/// ツールが無い場合はエラー行を1行流して失敗扱い
#[test]
fn test_missing_tool_reports_error_line() {
    let (tx, mut rx) = unbounded_channel();
    let mut relay = Relay::without_file(tx);
    let tool = MtkTool::new(
        Err(PhoenixError::ToolNotFound("no mtk".into())),
        ToolVocabulary::default(),
    );

    let report = run_job(Job::Reset, &tool, &mut relay, &CancelToken::new());

    assert_eq!(report.failed_steps, 1);
    assert_eq!(report.log_path, None);
    let relayed = records(&mut rx);
    let error = relayed.iter().find(|r| r.level == LogLevel::Err).unwrap();
    assert!(error.text.starts_with("ERROR: mtk tool not found"));
}

/// 単発の書き込みは動詞・パーティション名・パスの順で渡る
#[test]
fn test_single_flash_arguments() {
    let (tx, mut rx) = unbounded_channel();
    let mut relay = Relay::without_file(tx);
    let op = phoenix_common::FlashOperation::for_key(PartitionKey::Boot, std::path::Path::new("/fw/boot.img"));

    let report = run_job(Job::Flash(op), &fake_tool(), &mut relay, &CancelToken::new());

    assert_eq!(report.failed_steps, 0);
    let texts: Vec<String> = records(&mut rx).into_iter().map(|r| r.text).collect();
    assert!(texts.contains(&"mtk w boot /fw/boot.img".to_string()));
    assert!(texts.contains(&"done".to_string()));
}
