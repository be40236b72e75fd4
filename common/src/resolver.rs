//! ファームウェア解決モジュール
//!
//! 検索ルートを優先順に走査し、論理パーティションキーごとに最初に見つかった
//! イメージファイルを割り当てる。
//!
//! - 上位ルートで確定したキーは下位ルートで上書きしない
//! - 最終手段の別名（ソフトマッチ）は仮置きで、後続ルートの本来のファイル名
//!   （ハードマッチ）が見つかれば置き換える
//! - 存在しない・読めないルートは黙ってスキップし、常に全キーの結果を返す

use crate::partition::{NameTable, PartitionKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// ルート配下を辿る最大深さ
pub const MAX_SEARCH_DEPTH: usize = 4;

/// マッチの強さ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrength {
    /// 本来のファイル名に一致
    Hard,
    /// 最終手段の別名に一致（置き換え可能）
    Soft,
}

/// 解決済みイメージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedImage {
    pub path: PathBuf,
    pub strength: MatchStrength,
}

/// キー → イメージパスの対応（解決パスごとのスナップショット）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareMapping {
    images: BTreeMap<PartitionKey, ResolvedImage>,
}

impl FirmwareMapping {
    /// テストや外部入力から直接組み立てる
    pub fn from_paths<P: Into<PathBuf>>(paths: impl IntoIterator<Item = (PartitionKey, P)>) -> Self {
        let images = paths
            .into_iter()
            .map(|(key, path)| {
                (
                    key,
                    ResolvedImage {
                        path: path.into(),
                        strength: MatchStrength::Hard,
                    },
                )
            })
            .collect();
        Self { images }
    }

    pub fn get(&self, key: PartitionKey) -> Option<&Path> {
        self.images.get(&key).map(|img| img.path.as_path())
    }

    pub fn resolved(&self, key: PartitionKey) -> Option<&ResolvedImage> {
        self.images.get(&key)
    }

    pub fn contains(&self, key: PartitionKey) -> bool {
        self.images.contains_key(&key)
    }

    /// ソフトマッチのまま残ったキーか
    pub fn is_provisional(&self, key: PartitionKey) -> bool {
        matches!(
            self.images.get(&key),
            Some(ResolvedImage {
                strength: MatchStrength::Soft,
                ..
            })
        )
    }

    /// どのルートにも見つからなかったキー
    pub fn missing(&self) -> Vec<PartitionKey> {
        PartitionKey::ALL
            .into_iter()
            .filter(|key| !self.images.contains_key(key))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PartitionKey, &ResolvedImage)> {
        self.images.iter().map(|(key, img)| (*key, img))
    }

    fn is_hard(&self, key: PartitionKey) -> bool {
        matches!(
            self.images.get(&key),
            Some(ResolvedImage {
                strength: MatchStrength::Hard,
                ..
            })
        )
    }
}

/// 検索ルートとファイル名テーブルからマッピングを作る
pub fn resolve(roots: &[PathBuf], table: &NameTable) -> FirmwareMapping {
    let mut mapping = FirmwareMapping::default();

    for root in roots {
        let pending: Vec<PartitionKey> = table.keys().filter(|key| !mapping.is_hard(*key)).collect();
        if pending.is_empty() {
            break;
        }
        if !root.is_dir() {
            continue;
        }

        let index = index_root(root);

        for key in pending {
            let Some(patterns) = table.get(key) else {
                continue;
            };

            if let Some(path) = first_match(&index, &patterns.primary) {
                mapping.images.insert(
                    key,
                    ResolvedImage {
                        path,
                        strength: MatchStrength::Hard,
                    },
                );
            } else if !mapping.contains(key) {
                // ソフトマッチはソフトマッチで置き換えない
                if let Some(path) = first_match(&index, &patterns.last_resort) {
                    mapping.images.insert(
                        key,
                        ResolvedImage {
                            path,
                            strength: MatchStrength::Soft,
                        },
                    );
                }
            }
        }
    }

    mapping
}

/// ルート配下のファイルを「小文字ファイル名 → パス」に索引化
///
/// 同名ファイルが複数ある場合は浅い階層を優先し、同じ深さなら名前順の走査で先に見つかった方。
fn index_root(root: &Path) -> HashMap<String, (usize, PathBuf)> {
    let mut index: HashMap<String, (usize, PathBuf)> = HashMap::new();

    for entry in WalkDir::new(root)
        .max_depth(MAX_SEARCH_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_lowercase();
        let depth = entry.depth();
        match index.get(&name) {
            Some((existing, _)) if *existing <= depth => {}
            _ => {
                index.insert(name, (depth, path.to_path_buf()));
            }
        }
    }

    index
}

fn first_match(index: &HashMap<String, (usize, PathBuf)>, patterns: &[String]) -> Option<PathBuf> {
    patterns
        .iter()
        .find_map(|pattern| index.get(&pattern.to_lowercase()).map(|(_, path)| path.clone()))
}
