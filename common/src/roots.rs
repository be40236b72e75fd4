//! 検索ルートの構築
//!
//! 優先順: ユーザー指定フォルダ → アプリ直下の firmware/ → アプリのフォルダ。
//! 正規化したパスで重複を除き、最初に現れた位置を保つ。

use std::path::{Path, PathBuf};

/// アプリフォルダ内のファームウェア置き場
pub const FIRMWARE_SUBDIR: &str = "firmware";

/// 優先順に並んだ検索ルート
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRoots {
    roots: Vec<PathBuf>,
}

impl SearchRoots {
    pub fn build(user_dir: Option<&Path>, app_dir: &Path) -> Self {
        let mut roots = Self::default();

        if let Some(dir) = user_dir {
            if dir.is_dir() {
                roots.push(dir);
            }
        }

        let firmware = app_dir.join(FIRMWARE_SUBDIR);
        if firmware.is_dir() {
            roots.push(&firmware);
        }

        roots.push(app_dir);
        roots
    }

    /// 正規化して未登録なら末尾に追加
    pub fn push(&mut self, dir: &Path) {
        let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        if !self.roots.contains(&canonical) {
            self.roots.push(canonical);
        }
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
