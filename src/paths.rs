//! アプリケーションのフォルダ構成
//!
//! 設定ファイル・ログ・firmware/ はすべて実行ファイルと同じフォルダに置く。

use crate::config::CONFIG_FILE_NAME;
use crate::error::Result;
use chrono::{DateTime, Local};
use phoenix_common::FIRMWARE_SUBDIR;
use std::path::{Path, PathBuf};

/// ログファイル名の接頭辞
pub const LOG_PREFIX: &str = "PhoenixR1_Log";

#[derive(Debug, Clone)]
pub struct AppPaths {
    app_dir: PathBuf,
}

impl AppPaths {
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
        }
    }

    /// 実行ファイルのフォルダを基準にする
    pub fn from_current_exe() -> Result<Self> {
        let exe = std::env::current_exe()?;
        let dir = exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self::new(dir))
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    pub fn firmware_dir(&self) -> PathBuf {
        self.app_dir.join(FIRMWARE_SUBDIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.app_dir.join(CONFIG_FILE_NAME)
    }

    /// `<prefix>_<YYYY-MM-DD_HH-MM-SS>.txt`
    pub fn log_path(&self, at: DateTime<Local>) -> PathBuf {
        self.app_dir.join(log_file_name(LOG_PREFIX, at))
    }
}

pub fn log_file_name(prefix: &str, at: DateTime<Local>) -> String {
    format!("{}_{}.txt", prefix, at.format("%Y-%m-%d_%H-%M-%S"))
}
