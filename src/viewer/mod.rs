//! ビューア（freeview）セッション管理
//!
//! 1被験者につき1つの freeview プロセスを起動する。プロセスとウィンドウは
//! セッションごとの相関ID（UUID）で識別し、ウィンドウタイトルとスクラッチの
//! ファイル名の両方に埋め込む。

mod freeview;
mod process;
mod window;

pub use freeview::{build_viewer_args, Freeview, StagedFiles};
pub use process::TerminationMode;
pub use window::WindowManager;

use crate::error::Result;
use async_trait::async_trait;
use seglabel_common::{SlotAssignment, WorklistRow};
use std::fmt;
use std::path::PathBuf;
use tokio::process::Child;
use tokio::task::JoinHandle;

/// セッションの相関ID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// xdotool でウィンドウを探すときのタイトル部分文字列
    pub fn title_pattern(&self) -> String {
        format!("UID: {}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// ウィンドウのサブタイトル（相関IDを含む）
pub fn window_title(subject_id: &str, id: &SessionId) -> String {
    format!("{} - {}", subject_id, id.title_pattern())
}

/// 起動済みのビューアセッション
#[derive(Debug)]
pub struct ViewerSession {
    pub id: SessionId,
    pub subject_id: String,
    pub slots: SlotAssignment,
    /// スクラッチに置いたファイル（終了後も削除しない）
    pub staged: Vec<PathBuf>,
    process: Option<Child>,
    hide_task: Option<JoinHandle<()>>,
}

impl ViewerSession {
    pub fn new(id: SessionId, subject_id: impl Into<String>, slots: SlotAssignment) -> Self {
        Self {
            id,
            subject_id: subject_id.into(),
            slots,
            staged: Vec::new(),
            process: None,
            hide_task: None,
        }
    }

    pub(crate) fn attach_process(&mut self, child: Child) {
        self.process = Some(child);
    }

    pub(crate) fn attach_hide_task(&mut self, task: JoinHandle<()>) {
        self.hide_task = Some(task);
    }

    pub(crate) fn take_process(&mut self) -> Option<Child> {
        self.process.take()
    }

    pub(crate) fn take_hide_task(&mut self) -> Option<JoinHandle<()>> {
        self.hide_task.take()
    }
}

/// ビューアの起動・表示・終了
///
/// セッションループはこのトレイト越しにビューアを扱う（テストでは偽物を差し込む）。
#[async_trait]
pub trait Viewer: Send + Sync {
    /// ビューアを起動して即座に返す（起動完了は待たない）
    async fn launch(&self, row: &WorklistRow, slots: SlotAssignment) -> Result<ViewerSession>;

    /// 隠しておいたウィンドウを表示する
    async fn reveal(&self, session: &mut ViewerSession);

    /// プロセスを終了させ、ウィンドウを閉じる
    async fn terminate(&self, session: ViewerSession) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_window_title_contains_pattern() {
        let id = SessionId::from("1234");
        let title = window_title("sub-01", &id);
        assert_eq!(title, "sub-01 - UID: 1234");
        assert!(title.contains(&id.title_pattern()));
    }
}
