//! 質問シーケンスの実行
//!
//! 状態機械（`Questionnaire`）を入力元につなぎ、質問の表示と再入力を行う。
//! 中断は `Outcome::Stopped` として返し、プロセスの終了は呼び出し側に任せる。

use crate::error::Result;
use crate::prompt::{AnswerSource, Reply};
use seglabel_common::{Answers, Question, Questionnaire, Step, STOP_COMMAND};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Answered(Answers),
    /// `stop` または Ctrl-C
    Stopped,
}

/// 5つの質問を順に行う
pub fn ask<S: AnswerSource + ?Sized>(source: &mut S) -> Result<Outcome> {
    println!(
        "[INFO] Awaiting answers. Type in \"{}\" at any point to stop labeling",
        STOP_COMMAND
    );

    let mut questionnaire = Questionnaire::new();
    let mut question = Question::Preference;
    show(question);

    loop {
        let input = match source.next_reply()? {
            Reply::Line(line) => line,
            Reply::Interrupt => return Ok(Outcome::Stopped),
        };

        match questionnaire.answer(&input) {
            Step::Ask(next) => {
                question = next;
                show(question);
            }
            Step::Invalid { input, .. } => {
                println!("[ERROR] \"{}\" is an invalid input.", input);
                show(question);
            }
            Step::Done(answers) => return Ok(Outcome::Answered(answers)),
            Step::Stop => return Ok(Outcome::Stopped),
        }
    }
}

fn show(question: Question) {
    println!("{}", question.prompt());
    std::io::stdout().flush().ok();
}
