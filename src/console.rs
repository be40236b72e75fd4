//! 端末への表示と確認ダイアログ

use crate::action::Action;
use crate::error::{PhoenixError, Result};
use crate::session::{Outcome, Prompt, Session};
use crate::worker::{JobHandle, JobReport, WorkerEvent};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use phoenix_common::{LogLevel, LogRecord, PartitionKey};

/// dialoguer による確認（`--yes` 指定時は常に承認）
pub struct ConsolePrompt {
    pub assume_yes: bool,
}

impl Prompt for ConsolePrompt {
    fn confirm(&mut self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// 重要度ごとの行頭マーク
pub fn format_record(record: &LogRecord) -> String {
    let mark = match record.level {
        LogLevel::Info => " ",
        LogLevel::Ok => "✔",
        LogLevel::Warn => "⚠",
        LogLevel::Err => "✖",
    };
    format!("{} {}", mark, record.text)
}

pub fn print_record(record: &LogRecord) {
    let line = format_record(record);
    if record.level == LogLevel::Err {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

/// ファームウェア1件分の状態表示
pub fn firmware_line(session: &Session, key: PartitionKey) -> String {
    let mapping = session.mapping();
    match mapping.resolved(key) {
        Some(image) => {
            let name = image
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let note = if mapping.is_provisional(key) {
                " (fallback name, replace with vendor.img if available)"
            } else {
                ""
            };
            format!("{:<18} {}: ready ✅{}  [{}]", key.label(), name, note, image.path.display())
        }
        None => format!("{:<18} missing ❌", key.label()),
    }
}

pub fn print_status(session: &Session, skip_optional: bool) {
    println!("🔥 PhoenixR1 - status\n");

    println!("Search roots:");
    for (i, root) in session.roots().as_slice().iter().enumerate() {
        println!("  {}. {}", i + 1, root.display());
    }

    println!("\nFirmware:");
    for key in PartitionKey::ALL {
        println!("  {}", firmware_line(session, key));
    }

    let tool = session.tool();
    println!("\nTool:   {}", match tool.command() {
        Some(command) => command.describe(),
        None => "not found".to_string(),
    });
    let verbs = tool.vocabulary();
    log::debug!(
        "verbs: write={} erase={} reset={} reboot={}",
        verbs.write, verbs.erase, verbs.reset, verbs.reboot_bootloader
    );
    println!("{}", session.device().summary());
    println!(
        "One-Click Restore: {}",
        if session.is_ready(skip_optional) && session.device().connected {
            "available"
        } else if session.is_ready(skip_optional) {
            "firmware ready, waiting for device"
        } else {
            "firmware incomplete"
        }
    );
}

/// ワーカーのイベントを表示しながら終了を待つ。Ctrl-C でキャンセル
pub async fn stream_job(mut job: JobHandle) -> Result<JobReport> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(120));
    let cancel = job.cancel_token();

    loop {
        tokio::select! {
            event = job.events.recv() => match event {
                Some(WorkerEvent::Record(record)) => bar.println(format_record(&record)),
                Some(WorkerEvent::Progress { step, total }) => {
                    bar.set_message(format!("step {} of {}", step, total));
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                bar.println(format_record(&LogRecord::warn("Cancelling after the current output line …")));
                cancel.cancel();
            }
        }
    }

    bar.finish_and_clear();
    job.join().await
}

/// 操作を1つ実行して結果を表示する。成功したら true
pub async fn execute(session: &mut Session, action: Action, prompt: &mut dyn Prompt) -> Result<bool> {
    let outcome = match session.handle(action, prompt) {
        Ok(outcome) => outcome,
        Err(PhoenixError::Declined) => {
            print_record(&LogRecord::warn("Cancelled."));
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    match outcome {
        Outcome::Message(record) => {
            let ok = record.level != LogLevel::Err;
            print_record(&record);
            Ok(ok)
        }
        Outcome::Job(job) => {
            let handle = session.dispatch(job)?;
            let report = stream_job(handle).await?;
            if report.cancelled {
                print_record(&LogRecord::warn("Cancelled."));
            } else if report.failed_steps > 0 {
                print_record(&LogRecord::err(format!("{} step(s) failed", report.failed_steps)));
            }
            Ok(!report.cancelled && report.failed_steps == 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_record_marks() {
        assert_eq!(format_record(&LogRecord::ok("done")), "✔ done");
        assert_eq!(format_record(&LogRecord::err("boom")), "✖ boom");
        assert_eq!(format_record(&LogRecord::info("x")), "  x");
    }

    #[test]
    fn test_assume_yes_prompt() {
        let mut prompt = ConsolePrompt { assume_yes: true };
        assert!(prompt.confirm("anything?"));
    }
}
