//! 対話メニュー
//!
//! ボタン1つ = メニュー1項目。選ばれた項目を `Action` に変換して
//! `console::execute` に渡すだけで、判定はすべて `Session` 側で行う。

use crate::action::{Action, RestoreOptions};
use crate::console::{self, print_record, print_status, ConsolePrompt};
use crate::session::Session;
use anyhow::Result;
use dialoguer::{Confirm, Input, Select};
use phoenix_common::{FailurePolicy, LogRecord, PartitionKey};
use std::path::PathBuf;

const COMMUNITY_NOTICE: &str = "This is community-maintained software.\n\
Use at your own risk. Make sure you own the device and have the legal right to modify it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Status,
    Refresh,
    ChooseFirmwareDir,
    ChooseTool,
    Flash,
    Restore,
    Reset,
    RebootBootloader,
    Wipe,
    Zadig,
    DeviceManager,
    Community,
    Quit,
}

impl MenuItem {
    const ALL: [MenuItem; 13] = [
        MenuItem::Status,
        MenuItem::Refresh,
        MenuItem::ChooseFirmwareDir,
        MenuItem::ChooseTool,
        MenuItem::Flash,
        MenuItem::Restore,
        MenuItem::Reset,
        MenuItem::RebootBootloader,
        MenuItem::Wipe,
        MenuItem::Zadig,
        MenuItem::DeviceManager,
        MenuItem::Community,
        MenuItem::Quit,
    ];

    fn title(&self) -> &'static str {
        match self {
            MenuItem::Status => "Show status",
            MenuItem::Refresh => "Refresh firmware + device",
            MenuItem::ChooseFirmwareDir => "Choose firmware folder",
            MenuItem::ChooseTool => "Choose mtk tool",
            MenuItem::Flash => "Flash one partition",
            MenuItem::Restore => "One-Click Restore",
            MenuItem::Reset => "Reset device",
            MenuItem::RebootBootloader => "Reboot to bootloader",
            MenuItem::Wipe => "Wipe userdata",
            MenuItem::Zadig => "Open Zadig",
            MenuItem::DeviceManager => "Open Device Manager",
            MenuItem::Community => "Community mode",
            MenuItem::Quit => "Quit",
        }
    }

    /// 表示用の代表アクション（ラベルの注記に使う）
    fn sample_action(&self) -> Option<Action> {
        match self {
            MenuItem::Flash => Some(Action::Flash(PartitionKey::Boot)),
            MenuItem::Restore => Some(Action::Restore(RestoreOptions::default())),
            MenuItem::Reset => Some(Action::Reset),
            MenuItem::RebootBootloader => Some(Action::RebootBootloader),
            MenuItem::Wipe => Some(Action::WipeUserdata),
            _ => None,
        }
    }

    fn label(&self, connected: bool) -> String {
        let mut label = self.title().to_string();
        if let Some(action) = self.sample_action() {
            if action.is_destructive() {
                label.push_str(" ⚠");
            }
            if action.requires_device() && !connected {
                label.push_str("  (no device)");
            }
        }
        label
    }
}

/// メニューを繰り返し表示する。Esc か Quit で終了
pub async fn run(session: &mut Session) -> Result<()> {
    println!("🔥 PhoenixR1 - interactive mode\n");
    print_status(session, false);

    loop {
        println!();
        let connected = session.device().connected;
        let labels: Vec<String> = MenuItem::ALL.iter().map(|item| item.label(connected)).collect();
        let selection = Select::new()
            .with_prompt("Select an action")
            .items(&labels)
            .default(0)
            .interact_opt()?;

        let Some(item) = selection.map(|i| MenuItem::ALL[i]) else {
            break;
        };

        let action = match item {
            MenuItem::Quit => break,
            MenuItem::Status => {
                print_status(session, false);
                continue;
            }
            MenuItem::Community => {
                println!("\n{}", COMMUNITY_NOTICE);
                continue;
            }
            MenuItem::Refresh => Action::Refresh,
            MenuItem::ChooseFirmwareDir => Action::ChooseFirmwareDir(ask_path("Firmware folder (empty to clear)")?),
            MenuItem::ChooseTool => Action::ChooseTool(ask_path("Path to mtk (empty to auto-detect)")?),
            MenuItem::Flash => match ask_partition()? {
                Some(key) => Action::Flash(key),
                None => continue,
            },
            MenuItem::Restore => Action::Restore(ask_restore_options()?),
            MenuItem::Reset => Action::Reset,
            MenuItem::RebootBootloader => Action::RebootBootloader,
            MenuItem::Wipe => Action::WipeUserdata,
            MenuItem::Zadig => Action::OpenZadig,
            MenuItem::DeviceManager => Action::OpenDeviceManager,
        };

        let mut prompt = ConsolePrompt { assume_yes: false };
        if let Err(e) = console::execute(session, action, &mut prompt).await {
            print_record(&LogRecord::err(e.to_string()));
        }
    }

    Ok(())
}

fn ask_path(prompt: &str) -> Result<Option<PathBuf>> {
    let text: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| PathBuf::from(text)))
}

fn ask_partition() -> Result<Option<PartitionKey>> {
    let labels: Vec<&str> = PartitionKey::ALL.iter().map(|k| k.label()).collect();
    let selection = Select::new()
        .with_prompt("Partition")
        .items(&labels)
        .default(0)
        .interact_opt()?;
    Ok(selection.map(|i| PartitionKey::ALL[i]))
}

fn ask_restore_options() -> Result<RestoreOptions> {
    let wipe = Confirm::new()
        .with_prompt("Wipe userdata after flashing?")
        .default(false)
        .interact()?;
    let skip_optional = Confirm::new()
        .with_prompt("Skip vendor partition?")
        .default(false)
        .interact()?;
    let abort = Confirm::new()
        .with_prompt("Stop at the first failed step?")
        .default(false)
        .interact()?;

    Ok(RestoreOptions {
        skip_optional,
        wipe,
        policy: if abort { FailurePolicy::Abort } else { FailurePolicy::Continue },
    })
}
