//! ビューアプロセスの終了
//!
//! macOS の freeview は子プロセスを起動するため、プロセスグループごと SIGTERM を送る。
//! それ以外のプラットフォームではプロセス本体にだけ送る。

use crate::error::{Result, SegLabelError};
use tokio::process::Child;
#[cfg(unix)]
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationMode {
    /// プロセスグループ全体に送る
    Group,
    /// プロセス本体にだけ送る
    Direct,
}

impl TerminationMode {
    pub fn for_current_platform() -> Self {
        if cfg!(target_os = "macos") {
            TerminationMode::Group
        } else {
            TerminationMode::Direct
        }
    }

    /// 起動時に新しいプロセスグループを作る必要があるか
    pub fn needs_own_group(&self) -> bool {
        matches!(self, TerminationMode::Group)
    }

    /// `kill` に渡す対象（グループなら負のPID）
    pub fn kill_target(&self, pid: u32) -> String {
        match self {
            TerminationMode::Group => format!("-{}", pid),
            TerminationMode::Direct => pid.to_string(),
        }
    }
}

/// SIGTERM を送り、終了の回収はバックグラウンドに任せる
pub async fn terminate(mut child: Child, mode: TerminationMode) -> Result<()> {
    let Some(pid) = child.id() else {
        // 既に終了・回収済み
        return Ok(());
    };

    if !send_sigterm(pid, mode).await {
        log::debug!("kill -TERM unavailable for pid {}, falling back to start_kill", pid);
        child
            .start_kill()
            .map_err(|e| SegLabelError::ViewerLaunch(format!("failed to stop pid {}: {}", pid, e)))?;
    }

    tokio::spawn(async move {
        if let Err(e) = child.wait().await {
            log::debug!("wait for pid {} failed: {}", pid, e);
        }
    });
    Ok(())
}

#[cfg(unix)]
async fn send_sigterm(pid: u32, mode: TerminationMode) -> bool {
    let target = mode.kill_target(pid);
    match Command::new("kill")
        .args(["-s", "TERM", "--", &target])
        .status()
        .await
    {
        Ok(status) => status.success(),
        Err(e) => {
            log::debug!("kill command failed: {}", e);
            false
        }
    }
}

#[cfg(not(unix))]
async fn send_sigterm(_pid: u32, _mode: TerminationMode) -> bool {
    false
}
