//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use phoenix_common::{NameTable, PartitionKey, RestoreError};
use phoenix_r1::config::Config;
use phoenix_r1::error::PhoenixError;
use tempfile::tempdir;

/// 壊れた設定ファイルは既定値で続行
#[test]
fn test_broken_config_falls_back() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("phoenix_config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Config::load(&path), Err(PhoenixError::JsonParse(_))));
    assert_eq!(Config::load_or_default(&path), Config::default());
}

/// 未知のキーは無視する
#[test]
fn test_config_ignores_unknown_keys() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("phoenix_config.json");
    std::fs::write(&path, r#"{"mtk_path": "/opt/mtk", "theme": "dark"}"#).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.mtk_path().as_deref(), Some(std::path::Path::new("/opt/mtk")));
    assert_eq!(config.firmware_dir(), None);
}

/// 存在しないファイル名テーブル
#[test]
fn test_name_table_missing_file() {
    let result = NameTable::from_file(std::path::Path::new("/nonexistent/names_12345.json"));
    assert!(matches!(result, Err(phoenix_common::Error::Io(_))));
}

/// PhoenixErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        PhoenixError::NoDevice("No device or tools detected".to_string()),
        PhoenixError::MissingImage(PartitionKey::Boot),
        PhoenixError::NotReady(vec![PartitionKey::Vbmeta]),
        PhoenixError::Busy,
        PhoenixError::Declined,
        PhoenixError::FolderNotFound("/path/to/folder".to_string()),
        PhoenixError::ToolNotFound("mtk".to_string()),
        PhoenixError::Launch("zadig".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// 足りないイメージの一覧表示
#[test]
fn test_not_ready_lists_labels() {
    let err = PhoenixError::NotReady(vec![PartitionKey::Vbmeta, PartitionKey::SuperOrSystem]);
    let display = format!("{}", err);

    assert!(display.contains(PartitionKey::Vbmeta.label()));
    assert!(display.contains(PartitionKey::SuperOrSystem.label()));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: PhoenixError = io_err.into();

    assert!(matches!(err, PhoenixError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// 状態遷移エラーは共通エラー経由で変換
#[test]
fn test_restore_error_conversion() {
    let err: PhoenixError = RestoreError::NotReady.into();

    assert!(matches!(err, PhoenixError::Common(phoenix_common::Error::Restore(_))));
    assert!(format!("{}", err).contains("missing"));
}
