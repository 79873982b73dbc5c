//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error (line {line}): {message}")]
    Parse { line: usize, message: String },
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
