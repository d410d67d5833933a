// QOI decoder: chunk dispatch and raster reconstruction.
//
// State carried across chunks is the color cache and the previous pixel.
// Every chunk except RUN produces a new pixel that becomes the previous
// pixel and is written to its cache slot. RUN repeats the previous pixel and
// leaves the cache alone.
//
// Safety notes for hostile input:
//   - Chunk parsing is bounds checked; running off the payload mid-chunk is
//     `TruncatedStream` with the stream offset of the chunk's first byte
//   - Output capacity is bounded by what the payload could encode, not by
//     the declared dimensions alone
//   - Emitting more pixels than declared fails before the extra pixels are
//     materialized

use thiserror::Error;

use super::cache::ColorCache;
use super::chunk::{Chunk, ChunkIterator, MAX_RUN};
use super::header::{self, Descriptor, FormatError, HEADER_LEN};
use super::pixel::Pixel;
use crate::raster::Raster;

// ---------------------------------------------------------------------------
// Decoder error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("stream truncated inside the chunk at byte offset {offset}")]
    TruncatedStream { offset: usize },

    #[error("stream encodes {actual} pixels, descriptor declares {expected}")]
    SizeMismatch { expected: u64, actual: u64 },
}

// ---------------------------------------------------------------------------
// Chunk decoder state
// ---------------------------------------------------------------------------

/// Decoder state machine: applies chunks in stream order.
#[derive(Debug, Clone)]
pub struct ChunkDecoder {
    cache: ColorCache,
    prev: Pixel,
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self {
            cache: ColorCache::new(),
            prev: Pixel::OPAQUE_BLACK,
        }
    }

    #[inline]
    pub fn cache(&self) -> &ColorCache {
        &self.cache
    }

    /// Apply one chunk and return the pixel it produces.
    ///
    /// The caller emits that pixel `chunk.pixel_count()` times.
    pub fn apply(&mut self, chunk: Chunk) -> Pixel {
        let prev = self.prev;
        let pixel = match chunk {
            Chunk::Rgba { r, g, b, a } => Pixel::rgba(r, g, b, a),
            Chunk::Rgb { r, g, b } => Pixel::rgba(r, g, b, prev.a),
            Chunk::Index { idx } => self.cache.lookup(idx),
            Chunk::Diff { dr, dg, db } => prev.offset(dr, dg, db),
            Chunk::Luma { dg, dr_dg, db_dg } => {
                prev.offset(dr_dg.wrapping_add(dg), dg, db_dg.wrapping_add(dg))
            }
            Chunk::Run { .. } => return prev,
        };
        self.prev = pixel;
        self.cache.insert(pixel);
        pixel
    }
}

// ---------------------------------------------------------------------------
// Whole-stream decode
// ---------------------------------------------------------------------------

/// Decode a complete QOI stream held in memory.
pub fn decode_memory(bytes: &[u8]) -> Result<Raster, DecodeError> {
    decode_frame(bytes).map(|(_, raster)| raster)
}

/// Decode a complete stream, also returning its parsed header.
pub fn decode_frame(bytes: &[u8]) -> Result<(Descriptor, Raster), DecodeError> {
    let (descriptor, payload) = header::split_frame(bytes)?;
    let pixels = decode_payload(&descriptor, payload)?;

    log::debug!(
        "decoded qoi {}x{} ({} channels): {} payload bytes",
        descriptor.width,
        descriptor.height,
        descriptor.channels,
        payload.len()
    );

    let raster = Raster {
        width: descriptor.width,
        height: descriptor.height,
        channels: descriptor.channels,
        pixels,
    };
    Ok((descriptor, raster))
}

/// Decode a chunk payload (the bytes between header and end marker).
///
/// For a 3-channel descriptor the returned pixels are opaque; chunk state
/// still tracks the alpha the stream carries.
pub fn decode_payload(descriptor: &Descriptor, payload: &[u8]) -> Result<Vec<Pixel>, DecodeError> {
    let expected = descriptor.pixel_count();
    let bound = (payload.len() as u64)
        .saturating_mul(u64::from(MAX_RUN))
        .min(expected);
    let mut pixels = Vec::with_capacity(bound as usize);
    let opaque = descriptor.channels == 3;

    let mut state = ChunkDecoder::new();
    let mut iter = ChunkIterator::new(payload, HEADER_LEN);
    let mut chunks = 0u64;
    loop {
        // Every chunk yields at least one pixel, so bytes left after a
        // complete image always mean too many pixels.
        if pixels.len() as u64 == expected {
            if iter.position() < payload.len() {
                return Err(DecodeError::SizeMismatch {
                    expected,
                    actual: expected + 1,
                });
            }
            break;
        }
        let Some(item) = iter.next() else { break };
        let (_, chunk) = item?;
        let mut pixel = state.apply(chunk);
        if opaque {
            pixel.a = 255;
        }
        let count = chunk.pixel_count() as usize;

        let produced = (pixels.len() + count) as u64;
        if produced > expected {
            return Err(DecodeError::SizeMismatch {
                expected,
                actual: produced,
            });
        }
        pixels.extend(std::iter::repeat_n(pixel, count));
        chunks += 1;
    }

    if pixels.len() as u64 != expected {
        return Err(DecodeError::SizeMismatch {
            expected,
            actual: pixels.len() as u64,
        });
    }

    log::trace!("qoi payload: {chunks} chunks -> {expected} pixels");
    Ok(pixels)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qoi::header::{Colorspace, QOI_TRAILER};

    fn stream(width: u32, height: u32, channels: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        Descriptor {
            width,
            height,
            channels,
            colorspace: Colorspace::Srgb,
        }
        .write(&mut out);
        out.extend_from_slice(payload);
        out.extend_from_slice(&QOI_TRAILER);
        out
    }

    #[test]
    fn run_from_initial_state() {
        let raster = decode_memory(&stream(1, 1, 4, &[0xC0])).unwrap();
        assert_eq!(raster.pixels, vec![Pixel::OPAQUE_BLACK]);
    }

    #[test]
    fn rgb_keeps_previous_alpha() {
        let payload = [0xFF, 1, 2, 3, 77, 0xFE, 9, 9, 9];
        let raster = decode_memory(&stream(2, 1, 4, &payload)).unwrap();
        assert_eq!(
            raster.pixels,
            vec![Pixel::rgba(1, 2, 3, 77), Pixel::rgba(9, 9, 9, 77)]
        );
    }

    #[test]
    fn diff_and_luma_wrap() {
        // DIFF -2,-2,-2 from opaque black, then LUMA dg=+31, dr-dg=-8, db-dg=+7.
        let payload = [0x40, 0xBF, 0x0F];
        let raster = decode_memory(&stream(2, 1, 4, &payload)).unwrap();
        assert_eq!(raster.pixels[0], Pixel::rgb(254, 254, 254));
        // r: 254 + 23 = 277 -> 21, g: 254 + 31 -> 29, b: 254 + 38 -> 36
        assert_eq!(raster.pixels[1], Pixel::rgb(21, 29, 36));
    }

    #[test]
    fn index_reads_cached_pixel() {
        let p = Pixel::rgb(10, 20, 30);
        let idx = ColorCache::index(p);
        let payload = [0xFE, 10, 20, 30, 0x40, idx];
        let raster = decode_memory(&stream(3, 1, 3, &payload)).unwrap();
        assert_eq!(raster.pixels[0], p);
        assert_eq!(raster.pixels[2], p);
    }

    #[test]
    fn index_on_fresh_cache_yields_transparent() {
        let raster = decode_memory(&stream(1, 1, 4, &[0x07])).unwrap();
        assert_eq!(raster.pixels, vec![Pixel::TRANSPARENT]);
    }

    #[test]
    fn run_does_not_touch_cache() {
        let mut state = ChunkDecoder::new();
        state.apply(Chunk::Run { len: 5 });
        assert_eq!(state.cache().find(Pixel::OPAQUE_BLACK), None);
        state.apply(Chunk::Diff { dr: 0, dg: 0, db: 0 });
        assert!(state.cache().find(Pixel::OPAQUE_BLACK).is_some());
    }

    #[test]
    fn too_few_pixels() {
        assert_eq!(
            decode_memory(&stream(2, 2, 4, &[0xC1])),
            Err(DecodeError::SizeMismatch {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn too_many_pixels() {
        assert_eq!(
            decode_memory(&stream(2, 1, 4, &[0xC2])),
            Err(DecodeError::SizeMismatch {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn bytes_after_complete_image() {
        // RGB fills the single pixel, then a lone RGBA tag.
        assert_eq!(
            decode_memory(&stream(1, 1, 4, &[0xFE, 9, 9, 9, 0xFF])),
            Err(DecodeError::SizeMismatch {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn rgb_stream_output_is_opaque() {
        // RGBA sets alpha 9, RGB inherits it in state; output stays opaque.
        let payload = [0xFF, 1, 2, 3, 9, 0xFE, 4, 5, 6];
        let raster = decode_memory(&stream(2, 1, 3, &payload)).unwrap();
        assert_eq!(raster.pixels, vec![Pixel::rgb(1, 2, 3), Pixel::rgb(4, 5, 6)]);
        assert_eq!(raster.validate(), Ok(()));
    }

    #[test]
    fn frame_returns_descriptor() {
        let bytes = stream(2, 1, 4, &[0xC1]);
        let (d, raster) = decode_frame(&bytes).unwrap();
        assert_eq!((d.width, d.height, d.channels), (2, 1, 4));
        assert_eq!(d.colorspace, Colorspace::Srgb);
        assert_eq!(raster.pixels, vec![Pixel::OPAQUE_BLACK; 2]);
    }

    #[test]
    fn truncated_luma() {
        assert_eq!(
            decode_memory(&stream(2, 1, 4, &[0xC0, 0x90])),
            Err(DecodeError::TruncatedStream { offset: 15 })
        );
    }

    #[test]
    fn envelope_errors_propagate() {
        let mut bytes = stream(1, 1, 4, &[0xC0]);
        bytes[0] = b'Q';
        assert!(matches!(
            decode_memory(&bytes),
            Err(DecodeError::Format(FormatError::BadMagic { .. }))
        ));

        let mut bytes = stream(1, 1, 4, &[0xC0]);
        let last = bytes.len() - 1;
        bytes[last] = 0x03;
        assert!(matches!(
            decode_memory(&bytes),
            Err(DecodeError::Format(FormatError::BadTrailer { .. }))
        ));

        assert_eq!(
            decode_memory(b"qoif"),
            Err(DecodeError::Format(FormatError::TooShort { len: 4 }))
        );
    }

    #[test]
    fn huge_declared_size_with_tiny_payload() {
        let bytes = stream(1 << 15, 1 << 15, 4, &[0xFD]);
        assert_eq!(
            decode_memory(&bytes),
            Err(DecodeError::SizeMismatch {
                expected: 1 << 30,
                actual: 62
            })
        );
    }
}
