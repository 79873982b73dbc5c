//! 結果ファイル（追記専用CSV）
//!
//! 1被験者ごとにファイルを開いて1行追記し、すぐ閉じる。
//! プログラムが途中で落ちても、書き込み済みの行はそのまま再開に使える。

use crate::error::Result;
use seglabel_common::{csv, Confidence, LabelRecord};
use std::collections::{BTreeMap, HashSet};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ResultsStore {
    path: PathBuf,
}

impl ResultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// ラベル付け済みの被験者（先頭列）
    pub fn labeled_subjects(&self) -> Result<HashSet<String>> {
        if !self.exists() {
            return Ok(HashSet::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter_map(csv::first_field)
            .map(str::to_string)
            .collect())
    }

    /// 1レコードを追記（開く→書く→flush→閉じる）
    pub fn append(&self, record: &LabelRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(record.to_csv_line().as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// 全レコードを読み込む（不正な行は数だけ返す）
    pub fn read_all(&self) -> Result<(Vec<LabelRecord>, usize)> {
        if !self.exists() {
            return Ok((Vec::new(), 0));
        }

        let content = std::fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        let mut malformed = 0;

        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match LabelRecord::parse_line(line, idx + 1) {
                Ok(record) => records.push(record),
                Err(e) => {
                    log::warn!("{}: {}", self.path.display(), e);
                    malformed += 1;
                }
            }
        }

        Ok((records, malformed))
    }

    pub fn summarize(&self) -> Result<Summary> {
        let (records, malformed) = self.read_all()?;
        Ok(Summary::from_records(&records, malformed))
    }
}

/// 結果ファイルの集計
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub malformed: usize,
    pub by_labeler: BTreeMap<String, usize>,
    /// メソッド名 → 「良い」と選ばれた回数
    pub wins: BTreeMap<String, usize>,
    pub confidence: BTreeMap<&'static str, usize>,
    /// 失敗と判定されたレコード数
    pub failures: usize,
    pub mean_elapsed_secs: f64,
}

impl Summary {
    pub fn from_records(records: &[LabelRecord], malformed: usize) -> Self {
        let mut summary = Summary {
            total: records.len(),
            malformed,
            ..Default::default()
        };

        for record in records {
            *summary.by_labeler.entry(record.labeler.clone()).or_default() += 1;
            *summary.wins.entry(record.best.clone()).or_default() += 1;
            // 負けた側も0件で表示されるように
            for method in [&record.slot1, &record.slot2] {
                summary.wins.entry(method.clone()).or_default();
            }
            *summary.confidence.entry(record.confidence.as_str()).or_default() += 1;
            if record.failed != "None" {
                summary.failures += 1;
            }
        }

        for confidence in [Confidence::Random, Confidence::Uncertain, Confidence::Certain] {
            summary.confidence.entry(confidence.as_str()).or_default();
        }

        if !records.is_empty() {
            let sum: f64 = records.iter().map(|r| r.elapsed_secs).sum();
            summary.mean_elapsed_secs = sum / records.len() as f64;
        }

        summary
    }
}
