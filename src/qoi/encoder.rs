// QOI encoder: per-pixel opcode selection.
//
// For each pixel, in this exact order:
//   1. equal to the previous pixel      -> extend the open run (flush at 62)
//   2. hit in the color cache           -> INDEX
//   3. same alpha, small RGB deltas     -> DIFF
//   4. same alpha, luma-shaped deltas   -> LUMA
//   5. same alpha                       -> RGB
//   6. otherwise                        -> RGBA
// An open run is flushed before any other chunk and at end of stream. Every
// non-run pixel is stored in its cache slot, mirroring the decoder.

use thiserror::Error;

use super::cache::ColorCache;
use super::chunk::{Chunk, MAX_RUN};
use super::header::{Colorspace, Descriptor, HEADER_LEN, QOI_TRAILER, TRAILER_LEN, ValidationError};
use super::pixel::Pixel;
use crate::raster::Raster;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Per-opcode chunk counts for one encoded image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub rgb: u64,
    pub rgba: u64,
    pub index: u64,
    pub diff: u64,
    pub luma: u64,
    pub run: u64,
    /// Pixels covered by RUN chunks.
    pub run_pixels: u64,
}

impl ChunkStats {
    pub fn record(&mut self, chunk: &Chunk) {
        match chunk {
            Chunk::Rgb { .. } => self.rgb += 1,
            Chunk::Rgba { .. } => self.rgba += 1,
            Chunk::Index { .. } => self.index += 1,
            Chunk::Diff { .. } => self.diff += 1,
            Chunk::Luma { .. } => self.luma += 1,
            Chunk::Run { len } => {
                self.run += 1;
                self.run_pixels += u64::from(*len);
            }
        }
    }

    /// Total number of chunks.
    pub fn chunks(&self) -> u64 {
        self.rgb + self.rgba + self.index + self.diff + self.luma + self.run
    }

    /// Payload size in bytes implied by the counts.
    pub fn payload_bytes(&self) -> u64 {
        self.rgba * 5 + self.rgb * 4 + self.luma * 2 + self.index + self.diff + self.run
    }
}

// ---------------------------------------------------------------------------
// Chunk encoder state
// ---------------------------------------------------------------------------

/// Encoder state machine: feed pixels in row-major order, then `finish`.
#[derive(Debug, Clone)]
pub struct ChunkEncoder {
    cache: ColorCache,
    prev: Pixel,
    run: u8,
    stats: ChunkStats,
}

impl Default for ChunkEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkEncoder {
    pub fn new() -> Self {
        Self {
            cache: ColorCache::new(),
            prev: Pixel::OPAQUE_BLACK,
            run: 0,
            stats: ChunkStats::default(),
        }
    }

    /// Encode one pixel, appending any completed chunks to `out`.
    pub fn push(&mut self, pixel: Pixel, out: &mut Vec<u8>) {
        if pixel == self.prev {
            self.run += 1;
            if self.run == MAX_RUN {
                self.flush_run(out);
            }
            return;
        }

        self.flush_run(out);
        let chunk = self.select(pixel);
        self.emit(chunk, out);
        self.cache.insert(pixel);
        self.prev = pixel;
    }

    /// Flush the open run, if any. Call once after the last pixel.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        self.flush_run(out);
    }

    pub fn stats(&self) -> ChunkStats {
        self.stats
    }

    /// Choose the chunk for a pixel that differs from the previous pixel.
    ///
    /// Pure with respect to encoder state; `push` applies the side effects.
    pub fn select(&self, pixel: Pixel) -> Chunk {
        if let Some(idx) = self.cache.find(pixel) {
            return Chunk::Index { idx };
        }

        let prev = self.prev;
        if pixel.a != prev.a {
            return Chunk::Rgba {
                r: pixel.r,
                g: pixel.g,
                b: pixel.b,
                a: pixel.a,
            };
        }

        let (dr, dg, db) = pixel.delta(prev);
        let small = |d: i8| (-2..=1).contains(&d);
        if small(dr) && small(dg) && small(db) {
            return Chunk::Diff { dr, dg, db };
        }

        let dr_dg = i16::from(dr) - i16::from(dg);
        let db_dg = i16::from(db) - i16::from(dg);
        if (-32..=31).contains(&dg) && (-8..=7).contains(&dr_dg) && (-8..=7).contains(&db_dg) {
            return Chunk::Luma {
                dg,
                dr_dg: dr_dg as i8,
                db_dg: db_dg as i8,
            };
        }

        Chunk::Rgb {
            r: pixel.r,
            g: pixel.g,
            b: pixel.b,
        }
    }

    fn flush_run(&mut self, out: &mut Vec<u8>) {
        if self.run > 0 {
            let len = self.run;
            self.run = 0;
            self.emit(Chunk::Run { len }, out);
        }
    }

    #[inline]
    fn emit(&mut self, chunk: Chunk, out: &mut Vec<u8>) {
        self.stats.record(&chunk);
        chunk.write_to(out);
    }
}

// ---------------------------------------------------------------------------
// Whole-image encode
// ---------------------------------------------------------------------------

/// Encode a raster to a complete QOI stream.
pub fn encode_memory(raster: &Raster, colorspace: u8) -> Result<Vec<u8>, EncodeError> {
    encode_memory_with_stats(raster, colorspace).map(|(bytes, _)| bytes)
}

/// Encode a raster, also returning per-opcode chunk counts.
///
/// Input is validated before any byte is produced, so a 3-channel raster
/// reaches the chunk logic fully opaque.
pub fn encode_memory_with_stats(
    raster: &Raster,
    colorspace: u8,
) -> Result<(Vec<u8>, ChunkStats), EncodeError> {
    let colorspace = Colorspace::try_from(colorspace)?;
    raster.validate()?;

    let descriptor = Descriptor {
        width: raster.width,
        height: raster.height,
        channels: raster.channels,
        colorspace,
    };

    let mut out = Vec::with_capacity(HEADER_LEN + raster.pixels.len() + TRAILER_LEN);
    descriptor.write(&mut out);

    let mut encoder = ChunkEncoder::new();
    for &pixel in &raster.pixels {
        encoder.push(pixel, &mut out);
    }
    encoder.finish(&mut out);
    out.extend_from_slice(&QOI_TRAILER);

    let stats = encoder.stats();
    log::debug!(
        "encoded qoi {}x{} ({} channels): {} chunks, {} bytes",
        raster.width,
        raster.height,
        raster.channels,
        stats.chunks(),
        out.len()
    );
    Ok((out, stats))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
