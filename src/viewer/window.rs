//! xdotool によるウィンドウ操作（任意機能）
//!
//! タイトルの部分一致でウィンドウを探すため、成功の保証はない。
//! すべての操作はタイムアウト付きのベストエフォートで、失敗してもログに残すだけ。

use super::SessionId;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

const XDOTOOL: &str = "xdotool";

#[derive(Debug, Clone)]
pub struct WindowManager {
    program: String,
    timeout: Duration,
}

impl WindowManager {
    /// xdotool が使えるか確認し、使えれば操作ハンドルを返す
    pub async fn detect(op_timeout: Duration) -> Option<Self> {
        let status = Command::new(XDOTOOL)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(_) => Some(Self {
                program: XDOTOOL.to_string(),
                timeout: op_timeout,
            }),
            Err(e) => {
                log::debug!("xdotool not available: {}", e);
                None
            }
        }
    }

    /// 起動直後のウィンドウを待って隠す（ウィンドウが現れるまで `--sync` で待機）
    pub async fn hide(&self, id: &SessionId) {
        let windows = self.search(id, true).await;
        for window in windows {
            self.run(&["windowunmap", "--sync", &window]).await;
        }
    }

    pub async fn show(&self, id: &SessionId) {
        for window in self.search(id, false).await {
            self.run(&["windowmap", &window]).await;
        }
    }

    pub async fn close(&self, id: &SessionId) {
        for window in self.search(id, false).await {
            self.run(&["windowclose", &window]).await;
        }
    }

    async fn search(&self, id: &SessionId, wait: bool) -> Vec<String> {
        let pattern = id.title_pattern();
        let mut args = vec!["search"];
        if wait {
            args.push("--sync");
        }
        args.extend(["--name", pattern.as_str()]);

        let output = Command::new(&self.program)
            .args(&args)
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        match timeout(self.timeout, output).await {
            Ok(Ok(output)) => parse_window_ids(&String::from_utf8_lossy(&output.stdout)),
            Ok(Err(e)) => {
                log::warn!("xdotool search failed: {}", e);
                Vec::new()
            }
            Err(_) => {
                log::warn!("window for {} not found within {:?}", pattern, self.timeout);
                Vec::new()
            }
        }
    }

    async fn run(&self, args: &[&str]) {
        let status = Command::new(&self.program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match timeout(self.timeout, status).await {
            Ok(Ok(status)) if status.success() => {}
            Ok(Ok(status)) => log::debug!("xdotool {:?} exited with {}", args, status),
            Ok(Err(e)) => log::warn!("xdotool {:?} failed: {}", args, e),
            Err(_) => log::warn!("xdotool {:?} timed out", args),
        }
    }
}

/// `xdotool search` の出力（1行1ウィンドウID）
fn parse_window_ids(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}
