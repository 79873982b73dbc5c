//! ワークリスト読み込みモジュール
//!
//! 入力CSV（ヘッダー付き）から比較対象の被験者一覧を読み込み、
//! 既にラベル付け済みの被験者を除外する。元のファイル順は保持する。
//!
//! 必須列: `subject_id`, `image`, メソッド名ごとのパス列, `x1`, `y1`, `z1`, `num_differences`
//! 任意列: `ID`（存在すれば結果ファイルのキーとして使う）

use crate::csv;
use crate::error::{Error, Result};
use crate::slots::MethodPair;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const SUBJECT_COLUMN: &str = "subject_id";
pub const KEY_COLUMN: &str = "ID";
pub const IMAGE_COLUMN: &str = "image";
pub const CENTER_COLUMNS: [&str; 3] = ["x1", "y1", "z1"];
pub const DIFFERENCES_COLUMN: &str = "num_differences";

/// ワークリストの1行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorklistRow {
    /// 被験者ID（差分マップのファイル名・ウィンドウタイトルに使う）
    pub subject_id: String,
    /// 結果ファイルのキー（`ID`列、なければ subject_id）
    pub key: String,
    /// 参照画像のパス
    pub image: String,
    /// method1 のセグメンテーション
    pub first_segmentation: String,
    /// method2 のセグメンテーション
    pub second_segmentation: String,
    /// 関心領域の中心座標（ボクセル）
    pub center: [f64; 3],
    /// 事前計算された差分数
    pub num_differences: f64,
}

/// 読み込み済みワークリスト
#[derive(Debug, Clone, Default)]
pub struct Worklist {
    rows: Vec<WorklistRow>,
    /// 入力ファイルの総行数（進捗表示用）
    total: usize,
    /// 結果ファイルにより除外された行数
    already_labeled: usize,
    /// ワークリスト内の重複キーとして除外された行数
    duplicates: usize,
}

impl Worklist {
    /// CSVファイルから読み込み
    pub fn from_csv(path: &Path, methods: &MethodPair) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_csv_str(&content, methods)
    }

    /// CSV文字列から読み込み
    pub fn from_csv_str(content: &str, methods: &MethodPair) -> Result<Self> {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());

        let header_line = lines
            .next()
            .map(|(_, l)| l.trim_start_matches('\u{feff}'))
            .ok_or_else(|| Error::Config("input table is empty".into()))?;
        let columns = ColumnIndex::from_header(header_line, methods)?;

        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        let mut duplicates = 0;
        let mut total = 0;

        for (idx, line) in lines {
            total += 1;
            let row = columns.parse_row(line, idx + 1)?;
            // 同一キーは最初の行のみ採用（1被験者1レコードを保つ）
            if !seen.insert(row.key.clone()) {
                duplicates += 1;
                continue;
            }
            rows.push(row);
        }

        Ok(Self {
            rows,
            total,
            already_labeled: 0,
            duplicates,
        })
    }

    /// ラベル付け済みの被験者を除外し、除外数を返す
    pub fn exclude_labeled(&mut self, labeled: &HashSet<String>) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !labeled.contains(&row.key));
        let removed = before - self.rows.len();
        self.already_labeled += removed;
        removed
    }

    pub fn rows(&self) -> &[WorklistRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<WorklistRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn already_labeled(&self) -> usize {
        self.already_labeled
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// ヘッダーから求めた列位置
struct ColumnIndex {
    subject: usize,
    key: Option<usize>,
    image: usize,
    first: usize,
    second: usize,
    center: [usize; 3],
    differences: usize,
    width: usize,
}

impl ColumnIndex {
    fn from_header(header: &str, methods: &MethodPair) -> Result<Self> {
        let names = csv::split_line(header);
        let positions: HashMap<&str, usize> =
            names.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        let mut missing = Vec::new();
        let mut find = |name: &str| match positions.get(name) {
            Some(&i) => i,
            None => {
                missing.push(name.to_string());
                0
            }
        };

        let subject = find(SUBJECT_COLUMN);
        let image = find(IMAGE_COLUMN);
        let first = find(methods.first.as_str());
        let second = find(methods.second.as_str());
        let center = [
            find(CENTER_COLUMNS[0]),
            find(CENTER_COLUMNS[1]),
            find(CENTER_COLUMNS[2]),
        ];
        let differences = find(DIFFERENCES_COLUMN);

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "input table is missing required columns: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            subject,
            key: positions.get(KEY_COLUMN).copied(),
            image,
            first,
            second,
            center,
            differences,
            width: names.len(),
        })
    }

    fn parse_row(&self, line: &str, line_no: usize) -> Result<WorklistRow> {
        let fields = csv::split_line(line);
        if fields.len() < self.width {
            return Err(Error::Parse {
                line: line_no,
                message: format!("expected {} fields, found {}", self.width, fields.len()),
            });
        }

        // inf / NaN は座標として使えないので数値として扱わない
        let number = |idx: usize, name: &str| -> Result<f64> {
            fields[idx]
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| Error::Parse {
                    line: line_no,
                    message: format!("{} is not a finite number: {:?}", name, fields[idx]),
                })
        };

        let subject_id = fields[self.subject].to_string();
        if subject_id.is_empty() {
            return Err(Error::Parse {
                line: line_no,
                message: format!("empty {}", SUBJECT_COLUMN),
            });
        }
        let key = self
            .key
            .map(|i| fields[i].to_string())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| subject_id.clone());
        // キーは結果ファイルの先頭列にそのまま書くため、区切り文字を含められない
        if key.contains([',', '"', '\r', '\n']) {
            return Err(Error::Parse {
                line: line_no,
                message: format!("key must not contain ',' or '\"': {:?}", key),
            });
        }

        Ok(WorklistRow {
            subject_id,
            key,
            image: fields[self.image].to_string(),
            first_segmentation: fields[self.first].to_string(),
            second_segmentation: fields[self.second].to_string(),
            center: [
                number(self.center[0], CENTER_COLUMNS[0])?,
                number(self.center[1], CENTER_COLUMNS[1])?,
                number(self.center[2], CENTER_COLUMNS[2])?,
            ],
            num_differences: number(self.differences, DIFFERENCES_COLUMN)?,
        })
    }
}
