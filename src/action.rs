//! ユーザー操作のコマンドオブジェクト

use phoenix_common::{FailurePolicy, PartitionKey};
use std::path::PathBuf;

/// 一括復旧のオプション
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// vendor をスキップ
    pub skip_optional: bool,
    /// 最後に userdata を消去
    pub wipe: bool,
    pub policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Refresh,
    /// None で設定を消す
    ChooseFirmwareDir(Option<PathBuf>),
    ChooseTool(Option<PathBuf>),
    Flash(PartitionKey),
    Restore(RestoreOptions),
    Reset,
    RebootBootloader,
    WipeUserdata,
    OpenZadig,
    OpenDeviceManager,
}

impl Action {
    pub fn id(&self) -> &'static str {
        match self {
            Action::Refresh => "refresh",
            Action::ChooseFirmwareDir(_) => "choose-firmware-dir",
            Action::ChooseTool(_) => "choose-tool",
            Action::Flash(_) => "flash",
            Action::Restore(_) => "restore",
            Action::Reset => "reset",
            Action::RebootBootloader => "reboot-bootloader",
            Action::WipeUserdata => "wipe",
            Action::OpenZadig => "open-zadig",
            Action::OpenDeviceManager => "open-device-manager",
        }
    }

    /// デバイス未検出なら拒否する操作
    pub fn requires_device(&self) -> bool {
        matches!(
            self,
            Action::Flash(_)
                | Action::Restore(_)
                | Action::Reset
                | Action::RebootBootloader
                | Action::WipeUserdata
        )
    }

    /// 確認が必要な破壊的操作
    pub fn is_destructive(&self) -> bool {
        match self {
            Action::WipeUserdata => true,
            Action::Restore(options) => options.wipe,
            _ => false,
        }
    }
}
