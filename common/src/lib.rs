//! seglabel Common Library
//!
//! CLIから切り離した純粋なロジック（ワークリスト、スロット割り当て、質問、結果レコード）

pub mod csv;
pub mod error;
pub mod path_map;
pub mod question;
pub mod record;
pub mod slots;
pub mod worklist;

pub use error::{Error, Result};
pub use path_map::{PathMap, PathMapping};
pub use question::{Question, Questionnaire, Step, STOP_COMMAND};
pub use record::{Answers, Confidence, DifferenceStrength, Failure, LabelRecord, RECORD_FIELDS};
pub use slots::{MethodPair, Slot, SlotAssignment};
pub use worklist::{Worklist, WorklistRow};
