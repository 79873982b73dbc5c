//! NIfTI 入出力（nifti クレート）

use crate::error::{Result, SegLabelError};
use ndarray::Array3;
use nifti::writer::WriterOptions;
use nifti::NiftiHeader;
use std::path::Path;

/// ヘッダーのみ読む（画素データは不要）
pub(super) fn read_header(path: &Path) -> Result<NiftiHeader> {
    Ok(NiftiHeader::from_file(path)?)
}

/// 空間3軸の形 `[x, y, z]`
pub(super) fn shape(header: &NiftiHeader, path: &Path) -> Result<[usize; 3]> {
    let dim = header.dim;
    if dim[0] < 3 {
        return Err(SegLabelError::Volume(format!(
            "{} is not a 3D volume (dim[0] = {})",
            path.display(),
            dim[0]
        )));
    }
    Ok([dim[1] as usize, dim[2] as usize, dim[3] as usize])
}

/// 参照ヘッダー（アフィン・ボクセルサイズ）を引き継いでマスクを書き出す
pub(super) fn write_mask(reference: &NiftiHeader, mask: &Array3<u8>, dest: &Path) -> Result<()> {
    let mut header = reference.clone();
    // マスク値がスケーリングされないように
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;

    WriterOptions::new(dest)
        .reference_header(&header)
        .write_nifti(mask)?;
    Ok(())
}
