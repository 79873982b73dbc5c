//! ボリューム画像モジュール
//!
//! 参照画像と同じ形の関心領域マスクを作り、スクラッチディレクトリへ書き出す。
//! NIfTI (`.nii`, `.nii.gz`) と FreeSurfer MGH (`.mgh`, `.mgz`) に対応する。
//!
//! ## 変更履歴
//! - 2026-10-18: 初期作成

mod mgh;
mod nii;

pub use mgh::MghHeader;

use crate::error::{Result, SegLabelError};
use ndarray::Array3;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// 関心領域キューブの一辺（ボクセル）
pub const ROI_EDGE: usize = 40;

/// 対応するボリューム形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    Nifti { compressed: bool },
    Mgh { compressed: bool },
}

impl VolumeFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.ends_with(".nii.gz") {
            Ok(VolumeFormat::Nifti { compressed: true })
        } else if name.ends_with(".nii") {
            Ok(VolumeFormat::Nifti { compressed: false })
        } else if name.ends_with(".mgz") {
            Ok(VolumeFormat::Mgh { compressed: true })
        } else if name.ends_with(".mgh") {
            Ok(VolumeFormat::Mgh { compressed: false })
        } else {
            Err(SegLabelError::Volume(format!(
                "unsupported volume format: {}",
                path.display()
            )))
        }
    }

    /// マスクの拡張子（常に圧縮形式で書く）
    pub fn mask_extension(&self) -> &'static str {
        match self {
            VolumeFormat::Nifti { .. } => ".nii.gz",
            VolumeFormat::Mgh { .. } => ".mgz",
        }
    }
}

/// コピー先ファイル名に付ける拡張子（`.nii.gz` は2段の拡張子として扱う）
pub fn staged_extension(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if name.to_lowercase().ends_with(".nii.gz") {
        return name[name.len() - ".nii.gz".len()..].to_string();
    }
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// 中心座標の周囲 `ROI_EDGE` のキューブ範囲（ボリューム内にクリップ）
///
/// 各軸 `[trunc(c) - 20, trunc(c) + 20)`。
pub fn roi_bounds(shape: [usize; 3], center: [f64; 3]) -> [Range<usize>; 3] {
    let half = (ROI_EDGE / 2) as i64;
    let axis = |dim: usize, c: f64| -> Range<usize> {
        // as i64 は飽和変換（NaN は 0）なので、加減算も飽和させる
        let c = c.trunc() as i64;
        let lo = c.saturating_sub(half).clamp(0, dim as i64) as usize;
        let hi = c.saturating_add(half).clamp(0, dim as i64) as usize;
        lo..hi.max(lo)
    };

    [
        axis(shape[0], center[0]),
        axis(shape[1], center[1]),
        axis(shape[2], center[2]),
    ]
}

/// 関心領域の外側を1、内側を0としたマスク
///
/// freeview では半透明のオーバーレイとして周囲を暗くし、関心領域を浮かび上がらせる。
pub fn build_roi_mask(shape: [usize; 3], center: [f64; 3]) -> Array3<u8> {
    let mut mask = Array3::<u8>::ones((shape[0], shape[1], shape[2]));
    let [x, y, z] = roi_bounds(shape, center);
    if !x.is_empty() && !y.is_empty() && !z.is_empty() {
        mask.slice_mut(ndarray::s![x, y, z]).fill(0);
    }
    mask
}

/// 参照画像のヘッダーから形を読み、マスクを `dest_dir/mask_<id><ext>` に書き出す
pub fn write_roi_mask(
    reference: &Path,
    center: [f64; 3],
    dest_dir: &Path,
    session_id: &str,
) -> Result<PathBuf> {
    let format = VolumeFormat::from_path(reference)?;
    let dest = dest_dir.join(format!("mask_{}{}", session_id, format.mask_extension()));

    match format {
        VolumeFormat::Nifti { .. } => {
            let header = nii::read_header(reference)?;
            let mask = build_roi_mask(nii::shape(&header, reference)?, center);
            nii::write_mask(&header, &mask, &dest)?;
        }
        VolumeFormat::Mgh { compressed } => {
            let header = MghHeader::read(reference, compressed)?;
            let mask = build_roi_mask(header.shape(), center);
            header.write_mask(&mask, &dest, true)?;
        }
    }

    log::debug!("mask written: {}", dest.display());
    Ok(dest)
}
