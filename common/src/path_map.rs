//! パス置換テーブル
//!
//! 入力CSVのパスが別の環境（ネットワークマウント等）を指している場合に、
//! 先頭一致で書き換える。最初に一致した規則のみ適用する。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// 置換規則 `from` → `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
    pub from: String,
    pub to: String,
}

impl std::str::FromStr for PathMapping {
    type Err = Error;

    /// `FROM=TO` 形式
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((from, to)) if !from.is_empty() => Ok(Self {
                from: from.to_string(),
                to: to.to_string(),
            }),
            _ => Err(Error::Config(format!(
                "invalid path mapping {:?}, expected FROM=TO",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMap {
    entries: Vec<PathMapping>,
}

impl PathMap {
    pub fn new(entries: Vec<PathMapping>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, mapping: PathMapping) {
        self.entries.push(mapping);
    }

    pub fn entries(&self) -> &[PathMapping] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn apply(&self, path: &str) -> String {
        for mapping in &self.entries {
            if let Some(rest) = path.strip_prefix(mapping.from.as_str()) {
                return format!("{}{}", mapping.to, rest);
            }
        }
        path.to_string()
    }
}
