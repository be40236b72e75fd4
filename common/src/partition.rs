//! 論理パーティションキーとファイル名テーブル
//!
//! ファームウェアイメージを役割（boot/vbmeta/super_or_system/vendor）で扱い、
//! 各役割に対して受け付けるファイル名を優先順で定義する。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// 論理パーティションキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKey {
    Boot,
    Vbmeta,
    SuperOrSystem,
    Vendor,
}

impl PartitionKey {
    /// 全キー（表示順）
    pub const ALL: [PartitionKey; 4] = [
        PartitionKey::Boot,
        PartitionKey::Vbmeta,
        PartitionKey::SuperOrSystem,
        PartitionKey::Vendor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKey::Boot => "boot",
            PartitionKey::Vbmeta => "vbmeta",
            PartitionKey::SuperOrSystem => "super_or_system",
            PartitionKey::Vendor => "vendor",
        }
    }

    /// ステータス表示用ラベル
    pub fn label(&self) -> &'static str {
        match self {
            PartitionKey::Boot => "boot.img",
            PartitionKey::Vbmeta => "vbmeta.img",
            PartitionKey::SuperOrSystem => "super/system.img",
            PartitionKey::Vendor => "vendor.img",
        }
    }

    /// イメージファイルから書き込み先パーティション名を決定
    ///
    /// super_or_system はファイル名が "super" で始まれば `super`、それ以外は `system`。
    pub fn partition_name(&self, image: &Path) -> &'static str {
        match self {
            PartitionKey::Boot => "boot",
            PartitionKey::Vbmeta => "vbmeta",
            PartitionKey::Vendor => "vendor",
            PartitionKey::SuperOrSystem => {
                let name = image
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                if name.starts_with("super") {
                    "super"
                } else {
                    "system"
                }
            }
        }
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PartitionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boot" => Ok(PartitionKey::Boot),
            "vbmeta" => Ok(PartitionKey::Vbmeta),
            "super_or_system" | "super" | "system" => Ok(PartitionKey::SuperOrSystem),
            "vendor" => Ok(PartitionKey::Vendor),
            _ => Err(format!(
                "Unknown partition: {}. Use boot, vbmeta, super, system, or vendor",
                s
            )),
        }
    }
}

/// 1キー分のファイル名パターン
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePatterns {
    /// 本来のファイル名（ハードマッチ）
    pub primary: Vec<String>,
    /// 最終手段の別名（ソフトマッチ、後続ルートのハードマッチで置き換わる）
    #[serde(default)]
    pub last_resort: Vec<String>,
}

impl NamePatterns {
    pub fn new<S: Into<String>>(primary: impl IntoIterator<Item = S>) -> Self {
        Self {
            primary: primary.into_iter().map(Into::into).collect(),
            last_resort: Vec::new(),
        }
    }

    pub fn with_last_resort<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.last_resort = names.into_iter().map(Into::into).collect();
        self
    }
}

/// キー → ファイル名パターンのテーブル
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameTable {
    entries: BTreeMap<PartitionKey, NamePatterns>,
}

impl NameTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: PartitionKey, patterns: NamePatterns) -> Self {
        self.entries.insert(key, patterns);
        self
    }

    pub fn get(&self, key: PartitionKey) -> Option<&NamePatterns> {
        self.entries.get(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = PartitionKey> + '_ {
        self.entries.keys().copied()
    }

    /// JSONファイルから読み込み（記載のないキーは探さない）
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        if table.entries.values().all(|p| p.primary.is_empty() && p.last_resort.is_empty()) {
            return Err(crate::Error::Config("name table lists no file names".into()));
        }
        Ok(table)
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::empty()
            .with(PartitionKey::Boot, NamePatterns::new(["boot.img", "boot.bin"]))
            .with(PartitionKey::Vbmeta, NamePatterns::new(["vbmeta.img", "vbmeta.bin"]))
            .with(
                PartitionKey::SuperOrSystem,
                NamePatterns::new(["super.img", "super.bin", "system.img", "system.bin"]),
            )
            .with(
                PartitionKey::Vendor,
                NamePatterns::new(["vendor.img", "vendor.bin"]).with_last_resort(["vendor_boot.img"]),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_partition_name_super() {
        let key = PartitionKey::SuperOrSystem;
        assert_eq!(key.partition_name(Path::new("/fw/super.img")), "super");
        assert_eq!(key.partition_name(Path::new("/fw/SUPER.bin")), "super");
        assert_eq!(key.partition_name(Path::new("/fw/system.img")), "system");
    }

    #[test]
    fn test_partition_name_fixed_keys() {
        let img = PathBuf::from("/fw/whatever.img");
        assert_eq!(PartitionKey::Boot.partition_name(&img), "boot");
        assert_eq!(PartitionKey::Vbmeta.partition_name(&img), "vbmeta");
        assert_eq!(PartitionKey::Vendor.partition_name(&img), "vendor");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("BOOT".parse::<PartitionKey>().unwrap(), PartitionKey::Boot);
        assert_eq!("system".parse::<PartitionKey>().unwrap(), PartitionKey::SuperOrSystem);
        assert!("userdata".parse::<PartitionKey>().is_err());
    }

    #[test]
    fn test_default_table_vendor_last_resort() {
        let table = NameTable::default();
        let vendor = table.get(PartitionKey::Vendor).unwrap();
        assert_eq!(vendor.primary[0], "vendor.img");
        assert_eq!(vendor.last_resort, vec!["vendor_boot.img".to_string()]);
        assert!(table.get(PartitionKey::Boot).unwrap().last_resort.is_empty());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "boot": {"primary": ["boot_a.img"]},
            "vendor": {"primary": ["vendor_a.img"], "last_resort": ["vendor_boot_a.img"]}
        }"#;
        let table = NameTable::from_json(json).unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), vec![PartitionKey::Boot, PartitionKey::Vendor]);
        assert_eq!(table.get(PartitionKey::Vendor).unwrap().last_resort[0], "vendor_boot_a.img");
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            NameTable::from_json(r#"{"userdata": {"primary": []}}"#),
            Err(crate::Error::Json(_))
        ));
    }

    #[test]
    fn test_from_json_without_names() {
        assert!(matches!(NameTable::from_json("{}"), Err(crate::Error::Config(_))));
        assert!(matches!(
            NameTable::from_json(r#"{"boot": {"primary": []}}"#),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&PartitionKey::SuperOrSystem).unwrap();
        assert_eq!(json, "\"super_or_system\"");
    }
}
