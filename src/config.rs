use crate::error::{Result, SegLabelError};
use seglabel_common::{PathMap, PathMapping};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `$FREESURFER_HOME` も設定ファイルもない場合に探すインストール先
const WELL_KNOWN_VIEWER_HOMES: &[&str] = &[
    "/usr/local/freesurfer",
    "/opt/freesurfer",
    "/Applications/freesurfer",
    "/Applications/freesurfer/7.1.1",
];

/// `~/.config/seglabel/config.json` に保存される設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// freeview のインストールルート（FreeSurfer home）
    pub viewer_home: Option<PathBuf>,
    /// マスク・セグメンテーションのコピー先
    pub scratch_dir: PathBuf,
    /// 入力パスの置換テーブル
    pub path_map: PathMap,
    /// xdotool によるウィンドウ操作を使うか
    pub window_automation: bool,
    pub timing: TimingConfig,
}

/// 待ち時間の設定（秒・ミリ秒）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub warmup_secs: u64,
    pub settle_millis: u64,
    pub reveal_delay_millis: u64,
    pub stop_grace_millis: u64,
    pub automation_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            warmup_secs: 12,
            settle_millis: 1000,
            reveal_delay_millis: 500,
            stop_grace_millis: 1000,
            automation_timeout_secs: 15,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewer_home: None,
            scratch_dir: std::env::temp_dir().join("labeling"),
            path_map: PathMap::default(),
            window_automation: true,
            timing: TimingConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| SegLabelError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("seglabel").join("config.json"))
    }

    pub fn add_path_mapping(&mut self, mapping: PathMapping) {
        self.path_map.push(mapping);
    }
}

/// 1回のラベリング実行で使う待ち時間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// 最初の2セッション起動後の待ち時間
    pub warmup: Duration,
    /// 起動からウィンドウを隠すまでの待ち時間
    pub settle: Duration,
    /// ウィンドウ表示前の待ち時間
    pub reveal_delay: Duration,
    /// 中断時にプロセス終了を待つ時間
    pub stop_grace: Duration,
    /// xdotool 呼び出しのタイムアウト
    pub automation_timeout: Duration,
}

impl Timing {
    /// 待ち時間なし（テスト用）
    pub fn immediate() -> Self {
        Self {
            warmup: Duration::ZERO,
            settle: Duration::ZERO,
            reveal_delay: Duration::ZERO,
            stop_grace: Duration::ZERO,
            automation_timeout: Duration::from_secs(1),
        }
    }
}

impl From<&TimingConfig> for Timing {
    fn from(config: &TimingConfig) -> Self {
        Self {
            warmup: Duration::from_secs(config.warmup_secs),
            settle: Duration::from_millis(config.settle_millis),
            reveal_delay: Duration::from_millis(config.reveal_delay_millis),
            stop_grace: Duration::from_millis(config.stop_grace_millis),
            automation_timeout: Duration::from_secs(config.automation_timeout_secs),
        }
    }
}

/// freeview を起動するための設定一式
///
/// 環境変数やカレントディレクトリに頼らず、起動側とセッションループに明示的に渡す。
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub viewer_home: PathBuf,
    pub scratch_dir: PathBuf,
    pub diff_maps_dir: Option<PathBuf>,
    pub path_map: PathMap,
    pub window_automation: bool,
    pub timing: Timing,
}

impl LaunchSettings {
    pub fn viewer_executable(&self) -> PathBuf {
        self.viewer_home.join("bin").join("freeview")
    }
}

/// freeview のインストールルートを決める
///
/// 優先順: CLI引数 → 設定ファイル → `$FREESURFER_HOME` → 既定のインストール先
pub fn resolve_viewer_home(
    cli_value: Option<&Path>,
    config: &Config,
    env_value: Option<&str>,
) -> Result<PathBuf> {
    if let Some(path) = cli_value {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &config.viewer_home {
        return Ok(path.clone());
    }
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return Ok(PathBuf::from(value));
    }

    WELL_KNOWN_VIEWER_HOMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.join("bin").join("freeview").exists())
        .ok_or_else(|| {
            SegLabelError::Config(
                "FreeSurfer home could not be determined. Use --fs or set FREESURFER_HOME".into(),
            )
        })
}

/// ラベラー名を決める（CLI引数 → `$USER` → `$USERNAME`）
pub fn resolve_labeler(cli_value: Option<&str>, env_user: Option<&str>) -> Result<String> {
    cli_value
        .or(env_user)
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .ok_or(SegLabelError::MissingLabeler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_viewer_home_priority() {
        let config = Config {
            viewer_home: Some(PathBuf::from("/from/config")),
            ..Default::default()
        };

        let resolved =
            resolve_viewer_home(Some(Path::new("/from/cli")), &config, Some("/from/env")).unwrap();
        assert_eq!(resolved, PathBuf::from("/from/cli"));

        let resolved = resolve_viewer_home(None, &config, Some("/from/env")).unwrap();
        assert_eq!(resolved, PathBuf::from("/from/config"));

        let resolved = resolve_viewer_home(None, &Config::default(), Some("/from/env")).unwrap();
        assert_eq!(resolved, PathBuf::from("/from/env"));
    }

    #[test]
    fn test_labeler_resolution() {
        assert_eq!(resolve_labeler(Some("anna"), Some("root")).unwrap(), "anna");
        assert_eq!(resolve_labeler(None, Some("root")).unwrap(), "root");
        assert!(matches!(
            resolve_labeler(None, None),
            Err(SegLabelError::MissingLabeler)
        ));
        assert!(matches!(
            resolve_labeler(Some("  "), None),
            Err(SegLabelError::MissingLabeler)
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"window_automation": false}"#).unwrap();
        assert!(!config.window_automation);
        assert_eq!(config.timing.warmup_secs, 12);
        assert!(config.path_map.is_empty());
    }

    #[test]
    fn test_timing_from_config() {
        let timing = Timing::from(&TimingConfig::default());
        assert_eq!(timing.warmup, Duration::from_secs(12));
        assert_eq!(timing.reveal_delay, Duration::from_millis(500));
    }
}
