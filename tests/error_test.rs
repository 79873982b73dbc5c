//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use seglabel::config::resolve_labeler;
use seglabel::error::SegLabelError;
use seglabel::scratch;
use seglabel_common::{MethodPair, Worklist};
use std::path::Path;
use tempfile::tempdir;

/// 存在しないワークリスト
#[test]
fn test_missing_worklist() {
    let methods = MethodPair::new("A", "B").unwrap();
    let result = Worklist::from_csv(Path::new("/nonexistent/worklist.csv"), &methods);
    assert!(matches!(result, Err(seglabel_common::Error::NotFound(_))));
}

/// 必須列が欠けたワークリストは設定エラー
#[test]
fn test_worklist_missing_columns() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("worklist.csv");
    std::fs::write(&path, "subject_id,image,A,x1,y1,z1,num_differences\nS1,/i,/a,1,2,3,4\n").unwrap();

    let methods = MethodPair::new("A", "B").unwrap();
    let err = Worklist::from_csv(&path, &methods).unwrap_err();
    assert!(matches!(err, seglabel_common::Error::Config(_)));
    assert!(err.to_string().contains('B'));
}

/// 不正なメソッド名
#[test]
fn test_invalid_method_names() {
    assert!(MethodPair::new("A", "A").is_err());
    assert!(MethodPair::new("", "B").is_err());
    assert!(MethodPair::new("A,1", "B").is_err());
}

/// ラベラー名が決まらない場合
#[test]
fn test_missing_labeler() {
    let err = resolve_labeler(None, None).unwrap_err();
    assert!(matches!(err, SegLabelError::MissingLabeler));
    assert!(err.to_string().contains("--user"));
}

/// 存在しないスクラッチディレクトリ
#[test]
fn test_scan_missing_scratch() {
    let result = scratch::scan_scratch(Path::new("/nonexistent/path/12345"));
    assert!(matches!(result, Err(SegLabelError::FileNotFound(_))));
}

/// SegLabelErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        SegLabelError::Config("テスト設定エラー".to_string()),
        SegLabelError::MissingLabeler,
        SegLabelError::FileNotFound("orig.mgz".to_string()),
        SegLabelError::ViewerLaunch("freeview".to_string()),
        SegLabelError::Volume("bad header".to_string()),
        SegLabelError::Prompt("closed".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: SegLabelError = io_err.into();

    assert!(matches!(err, SegLabelError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: SegLabelError = json_err.into();

    assert!(matches!(err, SegLabelError::JsonParse(_)));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_transparent() {
    let common_err = seglabel_common::Error::Config("設定エラー".to_string());
    let err: SegLabelError = common_err.into();

    assert!(matches!(err, SegLabelError::Common(_)));
    assert_eq!(format!("{}", err), "Config error: 設定エラー");
}
