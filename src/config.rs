use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 実行ファイルと同じフォルダに置く設定ファイル名
pub const CONFIG_FILE_NAME: &str = "phoenix_config.json";

/// 永続設定（キーが無ければ既定の探索を使う）
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// mtk 実行ファイルのパス
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtk_path: Option<String>,
    /// ユーザーが選んだファームウェアフォルダ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_dir: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// 読み込みに失敗しても既定値で続行する
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring unreadable config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn mtk_path(&self) -> Option<PathBuf> {
        non_empty(self.mtk_path.as_deref())
    }

    pub fn firmware_dir(&self) -> Option<PathBuf> {
        non_empty(self.firmware_dir.as_deref())
    }

    pub fn set_mtk_path(&mut self, path: Option<&Path>) {
        self.mtk_path = path.map(|p| p.display().to_string());
    }

    pub fn set_firmware_dir(&mut self, dir: Option<&Path>) {
        self.firmware_dir = dir.map(|p| p.display().to_string());
    }
}

fn non_empty(value: Option<&str>) -> Option<PathBuf> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = Config::default();
        config.set_firmware_dir(Some(Path::new("/data/r1")));
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.firmware_dir(), Some(PathBuf::from("/data/r1")));
        assert_eq!(loaded.mtk_path(), None);

        // 未設定キーは書き出さない
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("mtk_path"));
    }

    #[test]
    fn test_unknown_and_blank_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"mtk_path": "  ", "theme": "dark"}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.mtk_path(), None);
    }

    #[test]
    fn test_load_or_default_on_broken_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        assert!(Config::load(&path).is_err());
        assert_eq!(Config::load_or_default(&path), Config::default());
    }
}
