//! 質問シーケンスの状態機械
//!
//! 1被験者につき5つの質問を順に行う。各状態は入力の検証と変換だけを持ち、
//! 不正な入力では状態を進めない。`stop` でいつでも中断できる。

use crate::record::{Answers, Confidence, DifferenceStrength, Failure};
use crate::slots::Slot;

/// 中断コマンド
pub const STOP_COMMAND: &str = "stop";

/// 質問の種類（出題順）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Question {
    Preference,
    Confidence,
    Difference,
    Failure,
    Comment,
}

impl Question {
    pub const SEQUENCE: [Question; 5] = [
        Question::Preference,
        Question::Confidence,
        Question::Difference,
        Question::Failure,
        Question::Comment,
    ];

    pub fn prompt(&self) -> &'static str {
        match self {
            Question::Preference => {
                "[QUESTION] Which segmentation is better? \
                 If there is no discernible difference in quality choose a random number.\n\
                 Possible answers:\n\
                 - \"1\" if segmentation #1 is better\n\
                 - \"2\" if segmentation #2 is better"
            }
            Question::Confidence => {
                "[QUESTION] Choose your confidence in the rating.\n\
                 Possible answers:\n\
                 - \"1\" chosen randomly\n\
                 - \"2\" uncertain\n\
                 - \"3\" certain"
            }
            Question::Difference => {
                "[QUESTION] How big is the difference between the two segmentations?\n\
                 Possible answers:\n\
                 - \"0\" no discernible difference\n\
                 - \"1\" marginal difference\n\
                 - \"2\" moderate difference\n\
                 - \"3\" substantial difference"
            }
            Question::Failure => {
                "[QUESTION] Did one of the segmentations fail?\n\
                 Possible answers:\n\
                 - \"0\" no failures\n\
                 - \"1\" segmentation 1 failed\n\
                 - \"2\" segmentation 2 failed\n\
                 - \"3\" both failed"
            }
            Question::Comment => {
                "[COMMENT] Please leave comments on the viewed segmentations.\n\
                 Press enter to skip."
            }
        }
    }

    /// 受け付ける回答（自由記述は None）
    pub fn choices(&self) -> Option<&'static [&'static str]> {
        match self {
            Question::Preference => Some(&["1", "2"][..]),
            Question::Confidence => Some(&["1", "2", "3"][..]),
            Question::Difference | Question::Failure => Some(&["0", "1", "2", "3"][..]),
            Question::Comment => None,
        }
    }

    fn next(&self) -> Option<Question> {
        match self {
            Question::Preference => Some(Question::Confidence),
            Question::Confidence => Some(Question::Difference),
            Question::Difference => Some(Question::Failure),
            Question::Failure => Some(Question::Comment),
            Question::Comment => None,
        }
    }
}

/// 入力を1つ与えた結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// 次に出す質問
    Ask(Question),
    /// 不正な入力。同じ質問をもう一度出す
    Invalid { question: Question, input: String },
    /// 全質問に回答済み
    Done(Answers),
    /// 中断コマンドを受けた
    Stop,
}

/// 1被験者分の回答状態
#[derive(Debug, Clone, Default)]
pub struct Questionnaire {
    position: usize,
    preferred: Option<Slot>,
    confidence: Option<Confidence>,
    difference: Option<DifferenceStrength>,
    failure: Option<Failure>,
    /// 全質問に回答済みなら結果を保持する
    done: Option<Answers>,
}

impl Questionnaire {
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在の質問（回答済みなら None）
    pub fn current(&self) -> Option<Question> {
        if self.done.is_some() {
            None
        } else {
            Question::SEQUENCE.get(self.position).copied()
        }
    }

    /// 入力を検証し、有効なら状態を1つ進める
    pub fn answer(&mut self, raw: &str) -> Step {
        if let Some(answers) = &self.done {
            return Step::Done(answers.clone());
        }
        let Some(question) = self.current() else {
            unreachable!("question position {} is out of range", self.position);
        };
        let input = raw.trim();

        if input == STOP_COMMAND {
            return Step::Stop;
        }

        let accepted = match question {
            Question::Preference => parse_preference(input).map(|s| self.preferred = Some(s)),
            Question::Confidence => parse_confidence(input).map(|c| self.confidence = Some(c)),
            Question::Difference => parse_difference(input).map(|d| self.difference = Some(d)),
            Question::Failure => parse_failure(input).map(|f| self.failure = Some(f)),
            Question::Comment => return self.finish(input.to_string()),
        };

        if accepted.is_none() {
            return Step::Invalid {
                question,
                input: input.to_string(),
            };
        }

        // 次の質問がないのは Comment だけで、Comment は上で返している
        let Some(next) = question.next() else {
            unreachable!("{:?} has no following question", question);
        };
        self.position += 1;
        Step::Ask(next)
    }

    fn finish(&mut self, comment: String) -> Step {
        let (Some(preferred), Some(confidence), Some(difference), Some(failure)) =
            (self.preferred, self.confidence, self.difference, self.failure)
        else {
            unreachable!("comment asked before earlier questions were answered: {:?}", self);
        };

        let answers = Answers {
            preferred,
            confidence,
            difference,
            failure,
            comment,
        };
        self.done = Some(answers.clone());
        Step::Done(answers)
    }
}

fn parse_preference(input: &str) -> Option<Slot> {
    match input {
        "1" => Some(Slot::One),
        "2" => Some(Slot::Two),
        _ => None,
    }
}

fn parse_confidence(input: &str) -> Option<Confidence> {
    match input {
        "1" => Some(Confidence::Random),
        "2" => Some(Confidence::Uncertain),
        "3" => Some(Confidence::Certain),
        _ => None,
    }
}

fn parse_difference(input: &str) -> Option<DifferenceStrength> {
    match input {
        "0" | "1" | "2" | "3" => input.parse().ok().and_then(DifferenceStrength::new),
        _ => None,
    }
}

fn parse_failure(input: &str) -> Option<Failure> {
    match input {
        "0" => Some(Failure::None),
        "1" => Some(Failure::Slot1),
        "2" => Some(Failure::Slot2),
        "3" => Some(Failure::Both),
        _ => None,
    }
}
