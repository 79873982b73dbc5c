//! seglabel
//!
//! freeview で2つのセグメンテーション結果を並べて表示し、どちらが良いかを
//! ラベラーに尋ねて結果CSVに1行ずつ追記する。

pub mod cli;
pub mod config;
pub mod error;
pub mod prompt;
pub mod questions;
pub mod scratch;
pub mod session;
pub mod store;
pub mod viewer;
pub mod volume;
