// File-level helpers around the in-memory codec.
//
// Provides `encode_file()` and `decode_file()` for raw interleaved pixel
// files (RGB or RGBA, no header) and `.qoi` streams. The codec itself works
// on whole images, so files are read fully and written through a
// `BufWriter`. Optionally computes SHA-256 of the raw pixel bytes
// (feature-gated behind `file-io`) so an encode/decode pair can be checked.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::engine;
use crate::qoi::decoder::DecodeError;
use crate::qoi::encoder::{ChunkStats, EncodeError};
use crate::qoi::header::{Descriptor, FormatError, HEADER_LEN};
use crate::raster::Raster;

// ---------------------------------------------------------------------------
// Parameters and stats
// ---------------------------------------------------------------------------

/// Shape of a raw interleaved pixel file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLayout {
    pub width: u32,
    pub height: u32,
    /// 3 (RGB) or 4 (RGBA).
    pub channels: u8,
    /// Colorspace flag written to the header (0 or 1).
    pub colorspace: u8,
}

/// Statistics returned by `encode_file()`.
#[derive(Debug, Clone)]
pub struct EncodeStats {
    /// Raw input size in bytes.
    pub raw_size: u64,
    /// QOI output size in bytes.
    pub qoi_size: u64,
    /// Chunk counts per opcode.
    pub chunks: ChunkStats,
    /// SHA-256 of the raw input (if `file-io` feature is enabled).
    pub raw_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `decode_file()`.
#[derive(Debug, Clone)]
pub struct DecodeStats {
    /// QOI input size in bytes.
    pub qoi_size: u64,
    /// Raw output size in bytes.
    pub raw_size: u64,
    pub descriptor: Descriptor,
    /// SHA-256 of the raw output (if `file-io` feature is enabled).
    pub raw_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file I/O operations.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl From<FormatError> for IoError {
    fn from(e: FormatError) -> Self {
        Self::Decode(DecodeError::Format(e))
    }
}

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// encode_file / decode_file
// ---------------------------------------------------------------------------

/// Encode a raw interleaved pixel file at `raw_path` to `qoi_path`.
pub fn encode_file(
    raw_path: &Path,
    qoi_path: &Path,
    layout: RawLayout,
) -> Result<EncodeStats, IoError> {
    let raw = std::fs::read(raw_path)?;
    let raster = Raster::from_interleaved(layout.width, layout.height, layout.channels, &raw)
        .map_err(EncodeError::from)?;

    let (qoi, chunks) = engine::encode_with_stats(&raster, layout.colorspace)?;
    write_all_buffered(qoi_path, &qoi)?;

    Ok(EncodeStats {
        raw_size: raw.len() as u64,
        qoi_size: qoi.len() as u64,
        chunks,
        raw_sha256: digest(&raw),
    })
}

/// Decode the QOI file at `qoi_path` to raw interleaved pixels at `raw_path`.
///
/// The output uses the channel count declared in the header.
pub fn decode_file(qoi_path: &Path, raw_path: &Path) -> Result<DecodeStats, IoError> {
    let qoi = std::fs::read(qoi_path)?;
    let (descriptor, raster) = engine::decode_with_descriptor(&qoi)?;
    let raw = raster.to_interleaved();
    write_all_buffered(raw_path, &raw)?;

    Ok(DecodeStats {
        qoi_size: qoi.len() as u64,
        raw_size: raw.len() as u64,
        descriptor,
        raw_sha256: digest(&raw),
    })
}

/// Read and parse only the header of a QOI file.
pub fn read_descriptor_file(qoi_path: &Path) -> Result<Descriptor, IoError> {
    use std::io::Read;

    let mut head = Vec::with_capacity(HEADER_LEN);
    File::open(qoi_path)?
        .take(HEADER_LEN as u64)
        .read_to_end(&mut head)?;
    Ok(Descriptor::read(&head)?)
}

fn write_all_buffered(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::with_capacity(BUF_SIZE, File::create(path)?);
    writer.write_all(data)?;
    writer.flush()
}

#[cfg(feature = "file-io")]
fn digest(data: &[u8]) -> Option<[u8; 32]> {
    Some(sha2::Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
fn digest(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qoi::header::{Colorspace, ValidationError};

    fn checkerboard(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let on = ((i % width) / 4 + (i / width) / 4) % 2 == 0;
                if on { [250, 40, 40, 255] } else { [10, 10, 10, 128] }
            })
            .collect()
    }

    #[test]
    fn encode_decode_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("in.rgba");
        let qoi_path = dir.path().join("out.qoi");
        let back_path = dir.path().join("back.rgba");

        let raw = checkerboard(32, 24);
        std::fs::write(&raw_path, &raw).unwrap();

        let layout = RawLayout {
            width: 32,
            height: 24,
            channels: 4,
            colorspace: 1,
        };
        let enc = encode_file(&raw_path, &qoi_path, layout).unwrap();
        assert_eq!(enc.raw_size, raw.len() as u64);
        assert!(enc.qoi_size < enc.raw_size);
        assert_eq!(enc.qoi_size, std::fs::metadata(&qoi_path).unwrap().len());

        let dec = decode_file(&qoi_path, &back_path).unwrap();
        assert_eq!(dec.descriptor.width, 32);
        assert_eq!(dec.descriptor.colorspace, Colorspace::Linear);
        assert_eq!(std::fs::read(&back_path).unwrap(), raw);
        assert_eq!(dec.raw_sha256, enc.raw_sha256);
        assert_eq!(dec.descriptor, read_descriptor_file(&qoi_path).unwrap());
    }

    #[test]
    fn header_only_read() {
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("in.rgb");
        let qoi_path = dir.path().join("out.qoi");
        std::fs::write(&raw_path, [7u8; 2 * 3 * 3]).unwrap();

        let layout = RawLayout {
            width: 2,
            height: 3,
            channels: 3,
            colorspace: 0,
        };
        encode_file(&raw_path, &qoi_path, layout).unwrap();
        let d = read_descriptor_file(&qoi_path).unwrap();
        assert_eq!((d.width, d.height, d.channels), (2, 3, 3));
    }

    #[test]
    fn header_only_read_ignores_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("head.qoi");
        let mut bytes = Vec::new();
        Descriptor {
            width: 9,
            height: 4,
            channels: 4,
            colorspace: Colorspace::Srgb,
        }
        .write(&mut bytes);
        std::fs::write(&path, &bytes).unwrap();
        assert_eq!(read_descriptor_file(&path).unwrap().width, 9);

        std::fs::write(&path, &bytes[..10]).unwrap();
        assert!(matches!(
            read_descriptor_file(&path),
            Err(IoError::Decode(DecodeError::Format(FormatError::TooShort { len: 10 })))
        ));
    }

    #[test]
    fn wrong_raw_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("in.rgba");
        std::fs::write(&raw_path, [0u8; 10]).unwrap();

        let layout = RawLayout {
            width: 2,
            height: 2,
            channels: 4,
            colorspace: 0,
        };
        let err = encode_file(&raw_path, &dir.path().join("x.qoi"), layout).unwrap_err();
        assert!(matches!(
            err,
            IoError::Encode(EncodeError::Validation(
                ValidationError::BadBufferLength {
                    expected: 16,
                    actual: 10
                }
            ))
        ));
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.qoi");
        std::fs::write(&path, b"not a qoi file at all, really").unwrap();
        let err = decode_file(&path, &dir.path().join("out.raw")).unwrap_err();
        assert!(matches!(
            err,
            IoError::Decode(DecodeError::Format(FormatError::BadMagic { .. }))
        ));
    }

    #[cfg(feature = "file-io")]
    #[test]
    fn sha256_of_empty_is_known() {
        let d = digest(b"").unwrap();
        assert_eq!(d[0], 0xE3);
        assert_eq!(d[31], 0x55);
    }
}
