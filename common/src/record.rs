//! ラベル結果レコード
//!
//! 結果ファイルはヘッダーなしのCSVで、1被験者1行を追記していく。
//!
//! `subject,slot1,slot2,best,confidence,difference,failed,comment,labeler,elapsed,num_differences`

use crate::csv;
use crate::error::{Error, Result};
use crate::slots::{Slot, SlotAssignment};
use crate::worklist::WorklistRow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 結果ファイルの列数
pub const RECORD_FIELDS: usize = 11;

/// 評価の確信度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// 差がなくランダムに選んだ
    Random,
    Uncertain,
    Certain,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Random => "random",
            Confidence::Uncertain => "uncertain",
            Confidence::Certain => "certain",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "random" => Ok(Confidence::Random),
            "uncertain" => Ok(Confidence::Uncertain),
            "certain" => Ok(Confidence::Certain),
            _ => Err(format!("unknown confidence: {}", s)),
        }
    }
}

/// 2つのセグメンテーションの差の大きさ（0: 差なし 〜 3: 大きな差）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DifferenceStrength(u8);

impl DifferenceStrength {
    pub const MAX: u8 = 3;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// 失敗したセグメンテーション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Failure {
    None,
    Slot1,
    Slot2,
    Both,
}

impl Failure {
    /// 結果ファイルに書く値（スロットではなくメソッド名で記録する）
    pub fn label(&self, slots: &SlotAssignment) -> String {
        match self {
            Failure::None => "None".to_string(),
            Failure::Slot1 => slots.slot1.clone(),
            Failure::Slot2 => slots.slot2.clone(),
            Failure::Both => format!("{}+{}", slots.slot1, slots.slot2),
        }
    }
}

/// 1被験者分の回答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answers {
    pub preferred: Slot,
    pub confidence: Confidence,
    pub difference: DifferenceStrength,
    pub failure: Failure,
    pub comment: String,
}

/// 結果ファイルの1行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub subject: String,
    pub slot1: String,
    pub slot2: String,
    pub best: String,
    pub confidence: Confidence,
    pub difference: DifferenceStrength,
    pub failed: String,
    pub comment: String,
    pub labeler: String,
    pub elapsed_secs: f64,
    pub num_differences: f64,
}

impl LabelRecord {
    /// 回答からレコードを組み立てる（コメントはここでサニタイズ）
    pub fn from_answers(
        row: &WorklistRow,
        slots: &SlotAssignment,
        answers: &Answers,
        labeler: &str,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            subject: row.key.clone(),
            slot1: slots.slot1.clone(),
            slot2: slots.slot2.clone(),
            best: slots.method(answers.preferred).to_string(),
            confidence: answers.confidence,
            difference: answers.difference,
            failed: answers.failure.label(slots),
            comment: sanitize_field(&answers.comment),
            labeler: sanitize_field(labeler),
            elapsed_secs,
            num_differences: row.num_differences,
        }
    }

    /// 改行付きのCSV行
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}\n",
            self.subject,
            self.slot1,
            self.slot2,
            self.best,
            self.confidence,
            self.difference.value(),
            self.failed,
            self.comment,
            self.labeler,
            self.elapsed_secs,
            self.num_differences
        )
    }

    /// 結果ファイルの1行をパース
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self> {
        let fields = csv::split_line(line);
        if fields.len() != RECORD_FIELDS {
            return Err(Error::Parse {
                line: line_no,
                message: format!("expected {} fields, found {}", RECORD_FIELDS, fields.len()),
            });
        }

        let parse_err = |message: String| Error::Parse { line: line_no, message };

        let confidence = fields[4].parse::<Confidence>().map_err(parse_err)?;
        let difference = fields[5]
            .parse::<u8>()
            .ok()
            .and_then(DifferenceStrength::new)
            .ok_or_else(|| parse_err(format!("invalid difference strength: {}", fields[5])))?;
        let elapsed_secs = fields[9]
            .parse::<f64>()
            .map_err(|_| parse_err(format!("invalid elapsed time: {}", fields[9])))?;
        let num_differences = fields[10]
            .parse::<f64>()
            .map_err(|_| parse_err(format!("invalid difference count: {}", fields[10])))?;

        Ok(Self {
            subject: fields[0].to_string(),
            slot1: fields[1].to_string(),
            slot2: fields[2].to_string(),
            best: fields[3].to_string(),
            confidence,
            difference,
            failed: fields[6].to_string(),
            comment: fields[7].to_string(),
            labeler: fields[8].to_string(),
            elapsed_secs,
            num_differences,
        })
    }
}

/// 区切り文字を含む自由記述を1フィールドに収める
///
/// `,` は `;` に、改行と `"` は空白・`'` に置き換える。
pub fn sanitize_field(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| match c {
            ',' => ';',
            '\r' | '\n' => ' ',
            '"' => '\'',
            other => other,
        })
        .collect()
}
