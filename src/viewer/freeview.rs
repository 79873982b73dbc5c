//! freeview 起動モジュール
//!
//! マスクとセグメンテーションのコピーをスクラッチに置き、freeview を
//! バックグラウンドで起動する。起動完了は待たない。

use super::process::{self, TerminationMode};
use super::window::WindowManager;
use super::{window_title, SessionId, Viewer, ViewerSession};
use crate::config::LaunchSettings;
use crate::error::{Result, SegLabelError};
use crate::volume;
use async_trait::async_trait;
use seglabel_common::{SlotAssignment, WorklistRow};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// スクラッチに置いたファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFiles {
    pub mask: PathBuf,
    /// スロット1に表示するセグメンテーションのコピー
    pub seg1: PathBuf,
    /// スロット2に表示するセグメンテーションのコピー
    pub seg2: PathBuf,
}

impl StagedFiles {
    pub fn all(&self) -> Vec<PathBuf> {
        vec![self.mask.clone(), self.seg1.clone(), self.seg2.clone()]
    }
}

pub struct Freeview {
    settings: LaunchSettings,
    windows: Option<WindowManager>,
    termination: TerminationMode,
}

impl Freeview {
    pub fn new(settings: LaunchSettings, windows: Option<WindowManager>) -> Self {
        Self {
            settings,
            windows,
            termination: TerminationMode::for_current_platform(),
        }
    }

    /// 差分マップ（設定されていて、ファイルが存在する場合のみ）
    fn diff_map(&self, subject_id: &str) -> Option<PathBuf> {
        let dir = self.settings.diff_maps_dir.as_ref()?;
        let path = dir.join(format!("{}.nii.gz", subject_id));
        if path.exists() {
            Some(path)
        } else {
            log::warn!("difference map not found: {}", path.display());
            None
        }
    }

    async fn stage(
        &self,
        id: &SessionId,
        row: &WorklistRow,
        image: PathBuf,
        seg1: PathBuf,
        seg2: PathBuf,
    ) -> Result<StagedFiles> {
        let scratch = self.settings.scratch_dir.clone();
        let id = id.to_string();
        let subject = row.subject_id.clone();
        let center = row.center;

        tokio::task::spawn_blocking(move || -> Result<StagedFiles> {
            std::fs::create_dir_all(&scratch)?;
            let mask = volume::write_roi_mask(&image, center, &scratch, &id)?;
            let seg1 = copy_segmentation(&seg1, &scratch, &id, &subject, 1)?;
            let seg2 = copy_segmentation(&seg2, &scratch, &id, &subject, 2)?;
            Ok(StagedFiles { mask, seg1, seg2 })
        })
        .await
        .map_err(|e| SegLabelError::Volume(format!("staging task failed: {}", e)))?
    }
}

#[async_trait]
impl Viewer for Freeview {
    async fn launch(&self, row: &WorklistRow, slots: SlotAssignment) -> Result<ViewerSession> {
        let id = SessionId::generate();

        let map = &self.settings.path_map;
        let image = PathBuf::from(map.apply(&row.image));
        let (seg1, seg2) = slots.arrange(
            PathBuf::from(map.apply(&row.first_segmentation)),
            PathBuf::from(map.apply(&row.second_segmentation)),
        );
        for path in [&image, &seg1, &seg2] {
            if !path.exists() {
                return Err(SegLabelError::FileNotFound(path.display().to_string()));
            }
        }

        let executable = self.settings.viewer_executable();
        if !executable.exists() {
            return Err(SegLabelError::ViewerLaunch(format!(
                "freeview not found: {}",
                executable.display()
            )));
        }

        let staged = self.stage(&id, row, image.clone(), seg1, seg2).await?;
        let diff_map = self.diff_map(&row.subject_id);
        let args = build_viewer_args(
            &image,
            &staged,
            diff_map.as_deref(),
            &row.subject_id,
            &id,
            row.center,
        );
        log::debug!("{} {}", executable.display(), args.join(" "));

        let mut command = Command::new(&executable);
        command
            .args(&args)
            .env("FREESURFER_HOME", &self.settings.viewer_home)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        #[cfg(unix)]
        if self.termination.needs_own_group() {
            command.process_group(0);
        }

        let child = command.spawn().map_err(|e| {
            SegLabelError::ViewerLaunch(format!("{}: {}", executable.display(), e))
        })?;

        let mut session = ViewerSession::new(id, row.subject_id.clone(), slots);
        session.staged = staged.all();
        session.attach_process(child);

        // 先読みしたウィンドウが現在の作業を邪魔しないよう隠す
        if let Some(windows) = self.windows.clone() {
            let id = session.id.clone();
            let settle = self.settings.timing.settle;
            session.attach_hide_task(tokio::spawn(async move {
                tokio::time::sleep(settle).await;
                windows.hide(&id).await;
            }));
        }

        Ok(session)
    }

    async fn reveal(&self, session: &mut ViewerSession) {
        let Some(windows) = &self.windows else {
            return;
        };

        if let Some(task) = session.take_hide_task() {
            if let Err(e) = task.await {
                log::debug!("hide task for {} ended abnormally: {}", session.id, e);
            }
        }
        tokio::time::sleep(self.settings.timing.reveal_delay).await;
        windows.show(&session.id).await;
    }

    async fn terminate(&self, mut session: ViewerSession) -> Result<()> {
        if let Some(task) = session.take_hide_task() {
            task.abort();
        }
        if let Some(child) = session.take_process() {
            process::terminate(child, self.termination).await?;
        }
        for path in &session.staged {
            log::debug!("{}: scratch file kept: {}", session.id, path.display());
        }
        // macOS はプロセスグループ終了でウィンドウも閉じる
        if self.termination == TerminationMode::Direct {
            if let Some(windows) = &self.windows {
                windows.close(&session.id).await;
            }
        }
        Ok(())
    }
}

/// freeview のコマンドライン引数（シェルを介さない）
pub fn build_viewer_args(
    image: &Path,
    staged: &StagedFiles,
    diff_map: Option<&Path>,
    subject_id: &str,
    id: &SessionId,
    center: [f64; 3],
) -> Vec<String> {
    let mut args = vec!["-v".to_string(), format!("{}:lock=1", image.display())];

    if let Some(diff_map) = diff_map {
        args.push(format!(
            "{}:colormap=jet:colorscale=0,1:visible=0:opacity=0.25:lock=1:name=difference_map",
            diff_map.display()
        ));
    }

    args.push(format!(
        "{}:colormap=lut:name=1:visible=0:opacity=0.25",
        staged.seg1.display()
    ));
    args.push(format!(
        "{}:colormap=lut:name=2:visible=1:opacity=0.25",
        staged.seg2.display()
    ));
    args.push(format!(
        "{}:colormap=gecolor:colorscale=0,1:visible=1:opacity=0.3:lock=1:name=mask",
        staged.mask.display()
    ));

    args.push("-slice".to_string());
    args.extend(center.iter().map(|c| (c.round().max(0.0) as i64).to_string()));

    args.push("-subtitle".to_string());
    args.push(window_title(subject_id, id));

    args.push("-cc".to_string());
    args.push("-zoom".to_string());
    args.push("4".to_string());
    args
}

/// `<id>_<subject>_seg<slot><ext>` としてコピー
fn copy_segmentation(
    source: &Path,
    scratch: &Path,
    id: &str,
    subject: &str,
    slot: u8,
) -> Result<PathBuf> {
    let dest = scratch.join(format!(
        "{}_{}_seg{}{}",
        id,
        subject,
        slot,
        volume::staged_extension(source)
    ));
    std::fs::copy(source, &dest)?;
    Ok(dest)
}
