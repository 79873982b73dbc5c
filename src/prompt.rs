//! 回答の入力元
//!
//! コンソールでは標準入力を専用スレッドで1行ずつ読み、Ctrl-C は tokio の
//! シグナルハンドラで受けて同じチャネルに流す。読み込み待ちの最中でも
//! 中断を取りこぼさない。

use crate::error::{Result, SegLabelError};
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, Sender};

/// 入力1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Line(String),
    /// Ctrl-C または入力の終端
    Interrupt,
}

/// 質問への回答を1件ずつ返す
pub trait AnswerSource {
    /// 次の入力が来るまでブロックする
    fn next_reply(&mut self) -> Result<Reply>;
}

/// 標準入力と Ctrl-C を1本のチャネルにまとめた入力元
pub struct ConsoleInput {
    replies: Receiver<Reply>,
}

impl ConsoleInput {
    /// 読み込みスレッドとシグナル監視タスクを起動する（tokio ランタイム内で呼ぶ）
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        spawn_stdin_reader(tx.clone());
        spawn_interrupt_listener(tx);
        Self { replies: rx }
    }
}

impl AnswerSource for ConsoleInput {
    fn next_reply(&mut self) -> Result<Reply> {
        self.replies
            .recv()
            .map_err(|_| SegLabelError::Prompt("console input closed".into()))
    }
}

fn spawn_stdin_reader(tx: Sender<Reply>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let reply = match line {
                Ok(line) => Reply::Line(line),
                Err(e) => {
                    log::warn!("failed to read standard input: {}", e);
                    break;
                }
            };
            if tx.send(reply).is_err() {
                return;
            }
        }
        // 入力終端は中断と同じ扱い
        let _ = tx.send(Reply::Interrupt);
    });
}

fn spawn_interrupt_listener(tx: Sender<Reply>) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("cannot listen for Ctrl-C: {}", e);
                return;
            }
            println!();
            if tx.send(Reply::Interrupt).is_err() {
                return;
            }
        }
    });
}

/// 任意の `BufRead` から読む入力元（パイプ入力やテスト用）
pub struct ReaderInput<R> {
    reader: R,
}

impl<R: BufRead> ReaderInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> AnswerSource for ReaderInput<R> {
    fn next_reply(&mut self) -> Result<Reply> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Ok(Reply::Interrupt);
        }
        Ok(Reply::Line(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
