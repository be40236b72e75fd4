//! mtkclient 連携モジュール
//!
//! 実行ファイルの探索順:
//! 1. 設定された mtk のパス
//! 2. PATH 上の `mtk`
//! 3. `python -m mtkclient`
//!
//! 見つからない場合も例外にはせず、出力ストリームにエラー行を1行流す。

mod stream;

pub use stream::ToolOutput;

use crate::cancel::CancelToken;
use crate::error::{PhoenixError, Result};
use phoenix_common::{FlashOperation, ToolVocabulary};
use std::env;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const MTK_NAMES: &[&str] = &["mtk.exe", "mtk.cmd", "mtk"];
#[cfg(not(windows))]
const MTK_NAMES: &[&str] = &["mtk"];

#[cfg(windows)]
const PYTHON_NAMES: &[&str] = &["python.exe", "py.exe"];
#[cfg(not(windows))]
const PYTHON_NAMES: &[&str] = &["python3", "python"];

/// どの方法でツールを見つけたか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    Configured,
    SearchPath,
    PythonModule,
}

/// 起動コマンド（プログラム + 前置引数）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub prefix_args: Vec<String>,
    pub source: ToolSource,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>, prefix_args: Vec<String>, source: ToolSource) -> Self {
        Self {
            program: program.into(),
            prefix_args,
            source,
        }
    }

    pub fn describe(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.prefix_args.iter().cloned());
        parts.join(" ")
    }
}

/// mtk の実行方法を決める
pub fn locate_tool(configured: Option<&Path>) -> Result<ToolCommand> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(ToolCommand::new(path, Vec::new(), ToolSource::Configured));
        }
        log::warn!("Configured mtk path does not exist: {}", path.display());
    }

    if let Some(path) = MTK_NAMES.iter().find_map(|name| find_in_path(name)) {
        return Ok(ToolCommand::new(path, Vec::new(), ToolSource::SearchPath));
    }

    if let Some(python) = PYTHON_NAMES.iter().find_map(|name| find_in_path(name)) {
        return Ok(ToolCommand::new(
            python,
            vec!["-m".into(), "mtkclient".into()],
            ToolSource::PythonModule,
        ));
    }

    Err(PhoenixError::ToolNotFound(format!(
        "tried {}mtk on PATH and python -m mtkclient",
        configured
            .map(|p| format!("{}, ", p.display()))
            .unwrap_or_default()
    )))
}

pub(crate) fn find_in_path(binary: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(binary);
        if candidate.is_file() {
            Some(candidate)
        } else {
            None
        }
    })
}

/// mtkclient の操作
#[derive(Debug, Clone)]
pub struct MtkTool {
    command: std::result::Result<ToolCommand, String>,
    vocabulary: ToolVocabulary,
}

impl MtkTool {
    pub fn new(command: Result<ToolCommand>, vocabulary: ToolVocabulary) -> Self {
        Self {
            command: command.map_err(|e| e.to_string()),
            vocabulary,
        }
    }

    pub fn locate(configured: Option<&Path>, vocabulary: ToolVocabulary) -> Self {
        Self::new(locate_tool(configured), vocabulary)
    }

    pub fn command(&self) -> Option<&ToolCommand> {
        self.command.as_ref().ok()
    }

    pub fn is_available(&self) -> bool {
        self.command.is_ok()
    }

    pub fn vocabulary(&self) -> &ToolVocabulary {
        &self.vocabulary
    }

    /// 引数を付けて起動し、出力行のイテレータを返す
    pub fn invoke(&self, args: &[String], cancel: &CancelToken) -> ToolOutput {
        match &self.command {
            Ok(command) => {
                let mut full_args = command.prefix_args.clone();
                full_args.extend(args.iter().cloned());
                log::debug!("running {} {}", command.program.display(), full_args.join(" "));
                ToolOutput::spawn(&command.program, &full_args, cancel.clone())
            }
            Err(reason) => ToolOutput::failed(format!("ERROR: mtk tool not found ({})", reason)),
        }
    }

    pub fn flash(&self, op: &FlashOperation, cancel: &CancelToken) -> ToolOutput {
        self.invoke(&self.vocabulary.flash_args(op), cancel)
    }

    pub fn wipe_userdata(&self, cancel: &CancelToken) -> ToolOutput {
        self.invoke(&self.vocabulary.wipe_userdata_args(), cancel)
    }

    pub fn reset(&self, cancel: &CancelToken) -> ToolOutput {
        self.invoke(&self.vocabulary.reset_args(), cancel)
    }

    pub fn reboot_bootloader(&self, cancel: &CancelToken) -> ToolOutput {
        self.invoke(&self.vocabulary.reboot_bootloader_args(), cancel)
    }
}
