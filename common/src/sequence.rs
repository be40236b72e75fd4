//! 書き込みシーケンスの組み立て
//!
//! 書き込み順は vbmeta → boot → super/system → vendor で固定。
//! 必要に応じて末尾に userdata 消去を1つだけ追加する。

use crate::partition::PartitionKey;
use crate::record::LogRecord;
use crate::resolver::FirmwareMapping;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 書き込み順
pub const FLASH_ORDER: [PartitionKey; 4] = [
    PartitionKey::Vbmeta,
    PartitionKey::Boot,
    PartitionKey::SuperOrSystem,
    PartitionKey::Vendor,
];

/// 1パーティション分の書き込み
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashOperation {
    pub partition: String,
    pub image: PathBuf,
}

impl FlashOperation {
    pub fn new(partition: impl Into<String>, image: impl Into<PathBuf>) -> Self {
        Self {
            partition: partition.into(),
            image: image.into(),
        }
    }

    /// キーとイメージから書き込み先名を決めて作る
    pub fn for_key(key: PartitionKey, image: &Path) -> Self {
        Self::new(key.partition_name(image), image)
    }
}

/// シーケンスの1ステップ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Flash(FlashOperation),
    /// userdata の消去（書き込みの後に必ず最後）
    WipeUserdata,
}

impl Step {
    pub fn describe(&self) -> String {
        match self {
            Step::Flash(op) => format!("Flashing {} …", op.partition),
            Step::WipeUserdata => "Erasing userdata …".to_string(),
        }
    }
}

/// シーケンス組み立てオプション
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceOptions {
    /// vendor をスキップする
    pub skip_optional: bool,
    /// 最後に userdata を消去する
    pub wipe: bool,
}

/// 組み立て済みシーケンス
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashSequence {
    pub steps: Vec<Step>,
    /// 組み立て時の通知（vendor スキップなど）
    pub notices: Vec<LogRecord>,
}

impl FlashSequence {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn operations(&self) -> impl Iterator<Item = &FlashOperation> {
        self.steps.iter().filter_map(|step| match step {
            Step::Flash(op) => Some(op),
            Step::WipeUserdata => None,
        })
    }
}

/// マッピングからシーケンスを組み立てる
pub fn build_sequence(mapping: &FirmwareMapping, options: SequenceOptions) -> FlashSequence {
    let mut sequence = FlashSequence::default();

    for key in FLASH_ORDER {
        if key == PartitionKey::Vendor && options.skip_optional {
            sequence
                .notices
                .push(LogRecord::info("Skipping vendor partition (optional partition disabled)."));
            continue;
        }
        if let Some(image) = mapping.get(key) {
            sequence.steps.push(Step::Flash(FlashOperation::for_key(key, image)));
        }
    }

    if options.wipe {
        sequence.steps.push(Step::WipeUserdata);
    }

    sequence
}

/// 一括復旧を開始できるか
///
/// boot / vbmeta / super_or_system は必須。vendor は存在するかスキップ指定が必要。
pub fn is_ready(mapping: &FirmwareMapping, skip_optional: bool) -> bool {
    let core_present = [PartitionKey::Boot, PartitionKey::Vbmeta, PartitionKey::SuperOrSystem]
        .into_iter()
        .all(|key| mapping.contains(key));
    core_present && (skip_optional || mapping.contains(PartitionKey::Vendor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_mapping() -> FirmwareMapping {
        FirmwareMapping::from_paths([
            (PartitionKey::Boot, "/fw/boot.img"),
            (PartitionKey::Vbmeta, "/fw/vbmeta.img"),
            (PartitionKey::SuperOrSystem, "/fw/super.img"),
            (PartitionKey::Vendor, "/fw/vendor.img"),
        ])
    }

    #[test]
    fn test_build_full_order() {
        let seq = build_sequence(&full_mapping(), SequenceOptions::default());
        assert_eq!(
            seq.steps,
            vec![
                Step::Flash(FlashOperation::new("vbmeta", "/fw/vbmeta.img")),
                Step::Flash(FlashOperation::new("boot", "/fw/boot.img")),
                Step::Flash(FlashOperation::new("super", "/fw/super.img")),
                Step::Flash(FlashOperation::new("vendor", "/fw/vendor.img")),
            ]
        );
        assert!(seq.notices.is_empty());
    }

    #[test]
    fn test_build_skip_optional() {
        let options = SequenceOptions {
            skip_optional: true,
            wipe: false,
        };
        let seq = build_sequence(&full_mapping(), options);
        assert_eq!(seq.len(), 3);
        assert!(seq.operations().all(|op| op.partition != "vendor"));
        assert_eq!(seq.notices.len(), 1);
        assert_eq!(seq.notices[0].level, crate::LogLevel::Info);
    }

    #[test]
    fn test_build_wipe_is_last_and_single() {
        let options = SequenceOptions {
            skip_optional: false,
            wipe: true,
        };
        let seq = build_sequence(&full_mapping(), options);
        assert_eq!(seq.len(), 5);
        assert_eq!(seq.steps.last(), Some(&Step::WipeUserdata));
        assert_eq!(seq.steps.iter().filter(|s| **s == Step::WipeUserdata).count(), 1);

        let empty = build_sequence(&FirmwareMapping::default(), options);
        assert_eq!(empty.steps, vec![Step::WipeUserdata]);
    }

    #[test]
    fn test_build_omits_absent_keys() {
        let mapping = FirmwareMapping::from_paths([
            (PartitionKey::Boot, "/fw/boot.img"),
            (PartitionKey::SuperOrSystem, "/fw/system.img"),
        ]);
        let seq = build_sequence(&mapping, SequenceOptions::default());
        assert_eq!(
            seq.steps,
            vec![
                Step::Flash(FlashOperation::new("boot", "/fw/boot.img")),
                Step::Flash(FlashOperation::new("system", "/fw/system.img")),
            ]
        );
    }

    #[test]
    fn test_is_ready() {
        let full = full_mapping();
        assert!(is_ready(&full, false));
        assert!(is_ready(&full, true));

        let no_vendor = FirmwareMapping::from_paths([
            (PartitionKey::Boot, "/fw/boot.img"),
            (PartitionKey::Vbmeta, "/fw/vbmeta.img"),
            (PartitionKey::SuperOrSystem, "/fw/super.img"),
        ]);
        assert!(!is_ready(&no_vendor, false));
        assert!(is_ready(&no_vendor, true));

        for missing in [PartitionKey::Boot, PartitionKey::Vbmeta, PartitionKey::SuperOrSystem] {
            let mapping = FirmwareMapping::from_paths(
                PartitionKey::ALL
                    .into_iter()
                    .filter(|key| *key != missing)
                    .map(|key| (key, format!("/fw/{}.img", key))),
            );
            assert!(!is_ready(&mapping, false));
            assert!(!is_ready(&mapping, true));
        }
    }
}
