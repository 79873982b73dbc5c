//! 比較対象メソッドと表示スロットの割り当て
//!
//! 被験者ごとにメソッドを2つのスロットへランダムに割り当て、
//! オペレーターの回答を特定のメソッドから切り離す（ブラインド化）。

use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 表示スロット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    One,
    Two,
}

/// 比較する2つのメソッド名（入力CSVの列名でもある）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodPair {
    pub first: String,
    pub second: String,
}

impl MethodPair {
    /// メソッド名を検証して生成
    ///
    /// 空文字、カンマや `"` を含む名前、同一名は結果ファイルの列構造を壊すため拒否する。
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Result<Self> {
        let first = first.into();
        let second = second.into();

        for name in [&first, &second] {
            if name.trim().is_empty() {
                return Err(Error::Config("method name must not be empty".into()));
            }
            if name.contains([',', '"']) {
                return Err(Error::Config(format!(
                    "method name must not contain ',' or '\"': {}",
                    name
                )));
            }
        }
        if first == second {
            return Err(Error::Config(format!(
                "method1 and method2 must differ (both are {})",
                first
            )));
        }

        Ok(Self { first, second })
    }

    pub fn names(&self) -> [&str; 2] {
        [&self.first, &self.second]
    }
}

/// 1被験者分のスロット割り当て
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    /// スロット1に表示するメソッド
    pub slot1: String,
    /// スロット2に表示するメソッド
    pub slot2: String,
    /// method2 がスロット1に来ている場合 true
    pub swapped: bool,
}

impl SlotAssignment {
    /// 並べ替えなしの割り当て（method1 → スロット1）
    pub fn identity(methods: &MethodPair) -> Self {
        Self {
            slot1: methods.first.clone(),
            slot2: methods.second.clone(),
            swapped: false,
        }
    }

    /// 2要素の一様ランダムな置換で割り当てる
    pub fn shuffled<R: Rng + ?Sized>(methods: &MethodPair, rng: &mut R) -> Self {
        let mut order = [0usize, 1];
        order.shuffle(rng);
        let names = methods.names();

        Self {
            slot1: names[order[0]].to_string(),
            slot2: names[order[1]].to_string(),
            swapped: order[0] == 1,
        }
    }

    pub fn method(&self, slot: Slot) -> &str {
        match slot {
            Slot::One => &self.slot1,
            Slot::Two => &self.slot2,
        }
    }

    /// method1/method2 の順に並んだ値をスロット順に並べ替える
    pub fn arrange<T>(&self, for_first: T, for_second: T) -> (T, T) {
        if self.swapped {
            (for_second, for_first)
        } else {
            (for_first, for_second)
        }
    }
}
