//! スクラッチディレクトリの一覧と掃除
//!
//! ラベリング実行はスクラッチのファイルを消さない。溜まったマスクと
//! セグメンテーションのコピーはこのコマンドで明示的に削除する。

use crate::error::{Result, SegLabelError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: u64,
}

/// ビューア起動時に置いたファイルか（`mask_*`, `*_seg1*`, `*_seg2*`）
pub fn is_staged_name(file_name: &str) -> bool {
    file_name.starts_with("mask_") || file_name.contains("_seg1") || file_name.contains("_seg2")
}

pub fn scan_scratch(dir: &Path) -> Result<Vec<StagedFile>> {
    if !dir.exists() {
        return Err(SegLabelError::FileNotFound(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        if !is_staged_name(&file_name) {
            continue;
        }

        let bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(StagedFile {
            path: entry.path().to_path_buf(),
            file_name,
            bytes,
        });
    }

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(files)
}

/// 削除した件数とバイト数を返す
pub fn clean_scratch(dir: &Path) -> Result<(usize, u64)> {
    let mut removed = 0;
    let mut bytes = 0;
    for file in scan_scratch(dir)? {
        std::fs::remove_file(&file.path)?;
        removed += 1;
        bytes += file.bytes;
    }
    Ok((removed, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_staged_name() {
        assert!(is_staged_name("mask_1f0c.nii.gz"));
        assert!(is_staged_name("1f0c_sub-01_seg1.mgz"));
        assert!(is_staged_name("1f0c_sub-01_seg2.nii"));
        assert!(!is_staged_name("results.csv"));
        assert!(!is_staged_name("orig.mgz"));
    }

    #[test]
    fn test_scan_and_clean() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mask_u1.mgz"), b"1234").unwrap();
        fs::write(dir.path().join("u1_S1_seg1.mgz"), b"12").unwrap();
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();
        fs::create_dir(dir.path().join("u2_S2_seg2.d")).unwrap();

        let files = scan_scratch(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["mask_u1.mgz", "u1_S1_seg1.mgz"]);

        let (removed, bytes) = clean_scratch(dir.path()).unwrap();
        assert_eq!((removed, bytes), (2, 6));
        assert!(dir.path().join("notes.txt").exists());
        assert!(scan_scratch(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_scan_missing_dir() {
        let result = scan_scratch(Path::new("/nonexistent/seglabel/scratch"));
        assert!(matches!(result, Err(SegLabelError::FileNotFound(_))));
    }
}
