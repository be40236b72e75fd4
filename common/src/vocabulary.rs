//! 外部書き込みツール（mtkclient）の引数語彙
//!
//! ツールのバージョンによって動詞が変わるため、すべて差し替え可能にしておく。

use crate::sequence::FlashOperation;
use serde::{Deserialize, Serialize};

/// 各操作の動詞
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolVocabulary {
    /// パーティション書き込み（`w <part> <image>`）
    pub write: String,
    /// パーティション消去（`e userdata`）
    pub erase: String,
    /// ソフトリセット
    pub reset: String,
    /// ブートローダーへの再起動
    pub reboot_bootloader: String,
}

impl Default for ToolVocabulary {
    fn default() -> Self {
        Self {
            write: "w".into(),
            erase: "e".into(),
            reset: "reset".into(),
            // mtkclient には専用の動詞が無いので reset で代用
            reboot_bootloader: "reset".into(),
        }
    }
}

impl ToolVocabulary {
    pub fn flash_args(&self, op: &FlashOperation) -> Vec<String> {
        vec![
            self.write.clone(),
            op.partition.clone(),
            op.image.display().to_string(),
        ]
    }

    pub fn wipe_userdata_args(&self) -> Vec<String> {
        vec![self.erase.clone(), "userdata".into()]
    }

    pub fn reset_args(&self) -> Vec<String> {
        split_verb(&self.reset)
    }

    pub fn reboot_bootloader_args(&self) -> Vec<String> {
        split_verb(&self.reboot_bootloader)
    }
}

/// 複数語の動詞（例: "reset --mode fastboot"）を分割
fn split_verb(verb: &str) -> Vec<String> {
    verb.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let vocab = ToolVocabulary::default();
        let op = FlashOperation::new("boot", "/fw/boot.img");
        assert_eq!(vocab.flash_args(&op), vec!["w", "boot", "/fw/boot.img"]);
        assert_eq!(vocab.wipe_userdata_args(), vec!["e", "userdata"]);
        assert_eq!(vocab.reset_args(), vec!["reset"]);
        assert_eq!(vocab.reboot_bootloader_args(), vec!["reset"]);
    }

    #[test]
    fn test_override_multi_word_verb() {
        let vocab = ToolVocabulary {
            reboot_bootloader: "reset --mode fastboot".into(),
            ..Default::default()
        };
        assert_eq!(vocab.reboot_bootloader_args(), vec!["reset", "--mode", "fastboot"]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let vocab: ToolVocabulary = serde_json::from_str(r#"{"write": "write"}"#).unwrap();
        assert_eq!(vocab.write, "write");
        assert_eq!(vocab.erase, "e");
    }
}
