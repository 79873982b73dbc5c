//! FreeSurfer MGH/MGZ のヘッダー読み込みとマスク書き出し
//!
//! ヘッダーは284バイト固定長のビッグエンディアン。
//! 画素データは x が最速で変化する順に並ぶ。

use crate::error::{Result, SegLabelError};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array3;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const HEADER_SIZE: usize = 284;
const MGH_VERSION: i32 = 1;
const OFFSET_WIDTH: usize = 4;
const OFFSET_NFRAMES: usize = 16;
const OFFSET_TYPE: usize = 20;
const MRI_UCHAR: i32 = 0;

#[derive(Clone)]
pub struct MghHeader {
    raw: [u8; HEADER_SIZE],
}

impl std::fmt::Debug for MghHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MghHeader")
            .field("shape", &self.shape())
            .field("type", &self.int_at(OFFSET_TYPE))
            .finish()
    }
}

impl MghHeader {
    pub fn read(path: &Path, compressed: bool) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        let mut reader: Box<dyn Read> = if compressed {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let mut raw = [0u8; HEADER_SIZE];
        reader.read_exact(&mut raw).map_err(|e| {
            SegLabelError::Volume(format!("{}: truncated MGH header ({})", path.display(), e))
        })?;

        let header = Self { raw };
        if header.int_at(0) != MGH_VERSION {
            return Err(SegLabelError::Volume(format!(
                "{}: unsupported MGH version {}",
                path.display(),
                header.int_at(0)
            )));
        }
        Ok(header)
    }

    /// `[width, height, depth]`
    pub fn shape(&self) -> [usize; 3] {
        [
            self.int_at(OFFSET_WIDTH).max(0) as usize,
            self.int_at(OFFSET_WIDTH + 4).max(0) as usize,
            self.int_at(OFFSET_WIDTH + 8).max(0) as usize,
        ]
    }

    /// 同じ幾何情報で UCHAR 1フレームのマスクを書き出す
    pub fn write_mask(&self, mask: &Array3<u8>, dest: &Path, compressed: bool) -> Result<()> {
        let (w, h, d) = mask.dim();
        if [w, h, d] != self.shape() {
            return Err(SegLabelError::Volume(format!(
                "mask shape {:?} does not match header {:?}",
                [w, h, d],
                self.shape()
            )));
        }

        let mut raw = self.raw;
        raw[OFFSET_NFRAMES..OFFSET_NFRAMES + 4].copy_from_slice(&1i32.to_be_bytes());
        raw[OFFSET_TYPE..OFFSET_TYPE + 4].copy_from_slice(&MRI_UCHAR.to_be_bytes());

        // 転置ビューの論理順は x が最速
        let data: Vec<u8> = mask.t().iter().copied().collect();

        let file = BufWriter::new(File::create(dest)?);
        if compressed {
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(&raw)?;
            encoder.write_all(&data)?;
            encoder.finish()?.flush()?;
        } else {
            let mut file = file;
            file.write_all(&raw)?;
            file.write_all(&data)?;
            file.flush()?;
        }
        Ok(())
    }

    fn int_at(&self, offset: usize) -> i32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.raw[offset..offset + 4]);
        i32::from_be_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn header_bytes(shape: [i32; 3], frames: i32, data_type: i32) -> [u8; HEADER_SIZE] {
        let mut raw = [0u8; HEADER_SIZE];
        raw[0..4].copy_from_slice(&MGH_VERSION.to_be_bytes());
        for (i, v) in shape.iter().enumerate() {
            let at = OFFSET_WIDTH + i * 4;
            raw[at..at + 4].copy_from_slice(&v.to_be_bytes());
        }
        raw[OFFSET_NFRAMES..OFFSET_NFRAMES + 4].copy_from_slice(&frames.to_be_bytes());
        raw[OFFSET_TYPE..OFFSET_TYPE + 4].copy_from_slice(&data_type.to_be_bytes());
        raw
    }

    #[test]
    fn test_read_uncompressed_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orig.mgh");
        std::fs::write(&path, header_bytes([4, 3, 2], 1, 3)).unwrap();

        let header = MghHeader::read(&path, false).unwrap();
        assert_eq!(header.shape(), [4, 3, 2]);
    }

    #[test]
    fn test_rejects_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.mgh");
        std::fs::write(&path, [0u8; 10]).unwrap();
        assert!(matches!(
            MghHeader::read(&path, false),
            Err(SegLabelError::Volume(_))
        ));
    }

    #[test]
    fn test_mask_written_x_fastest_as_uchar() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("orig.mgh");
        std::fs::write(&src, header_bytes([2, 2, 2], 3, 3)).unwrap();
        let header = MghHeader::read(&src, false).unwrap();

        let mut mask = Array3::<u8>::zeros((2, 2, 2));
        mask[[1, 0, 0]] = 1;
        mask[[0, 0, 1]] = 1;

        let dest = dir.path().join("mask.mgz");
        header.write_mask(&mask, &dest, true).unwrap();

        let mut decoded = Vec::new();
        GzDecoder::new(File::open(&dest).unwrap())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded.len(), HEADER_SIZE + 8);

        let written = MghHeader {
            raw: decoded[..HEADER_SIZE].try_into().unwrap(),
        };
        assert_eq!(written.shape(), [2, 2, 2]);
        assert_eq!(written.int_at(OFFSET_NFRAMES), 1);
        assert_eq!(written.int_at(OFFSET_TYPE), MRI_UCHAR);
        // index = x + y*w + z*w*h
        assert_eq!(&decoded[HEADER_SIZE..], &[0, 1, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("orig.mgh");
        std::fs::write(&src, header_bytes([2, 2, 2], 1, 0)).unwrap();
        let header = MghHeader::read(&src, false).unwrap();

        let mask = Array3::<u8>::zeros((3, 2, 2));
        assert!(header.write_mask(&mask, &dir.path().join("m.mgz"), true).is_err());
    }
}
