// QOI chunk grammar.
//
// Every chunk is byte aligned and self-delimiting. The two 8-bit tags are
// checked before the 2-bit tags, since 0xFE/0xFF would otherwise read as
// RUN lengths 63/64:
//
//   11111111 r g b a        RGBA
//   11111110 r g b          RGB
//   00iiiiii                INDEX  idx 0..63
//   01rrggbb                DIFF   each delta biased by 2, range -2..1
//   10gggggg rrrrbbbb       LUMA   dg biased by 32, dr-dg / db-dg biased by 8
//   11llllll                RUN    length biased by -1, range 1..62

use std::fmt;

use super::decoder::DecodeError;

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

pub const QOI_OP_INDEX: u8 = 0x00;
pub const QOI_OP_DIFF: u8 = 0x40;
pub const QOI_OP_LUMA: u8 = 0x80;
pub const QOI_OP_RUN: u8 = 0xC0;
pub const QOI_OP_RGB: u8 = 0xFE;
pub const QOI_OP_RGBA: u8 = 0xFF;

/// Mask for the 2-bit tag.
pub const QOI_MASK_2: u8 = 0xC0;

/// Longest run a single RUN chunk can carry.
pub const MAX_RUN: u8 = 62;

/// Longest chunk on the wire (RGBA).
pub const MAX_CHUNK_LEN: usize = 5;

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// One decoded chunk. Delta fields hold the unbiased signed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    Rgb { r: u8, g: u8, b: u8 },
    Rgba { r: u8, g: u8, b: u8, a: u8 },
    Index { idx: u8 },
    /// Each delta in `-2..=1`.
    Diff { dr: i8, dg: i8, db: i8 },
    /// `dg` in `-32..=31`, cross deltas in `-8..=7`.
    Luma { dg: i8, dr_dg: i8, db_dg: i8 },
    /// `len` in `1..=62`.
    Run { len: u8 },
}

impl Chunk {
    /// Bytes this chunk occupies on the wire.
    #[inline]
    pub const fn encoded_len(&self) -> usize {
        match self {
            Self::Rgba { .. } => 5,
            Self::Rgb { .. } => 4,
            Self::Luma { .. } => 2,
            Self::Index { .. } | Self::Diff { .. } | Self::Run { .. } => 1,
        }
    }

    /// Number of output pixels this chunk produces.
    #[inline]
    pub const fn pixel_count(&self) -> u32 {
        match self {
            Self::Run { len } => *len as u32,
            _ => 1,
        }
    }

    /// Short opcode name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rgb { .. } => "RGB",
            Self::Rgba { .. } => "RGBA",
            Self::Index { .. } => "INDEX",
            Self::Diff { .. } => "DIFF",
            Self::Luma { .. } => "LUMA",
            Self::Run { .. } => "RUN",
        }
    }

    /// Append the wire encoding to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match *self {
            Self::Rgba { r, g, b, a } => out.extend_from_slice(&[QOI_OP_RGBA, r, g, b, a]),
            Self::Rgb { r, g, b } => out.extend_from_slice(&[QOI_OP_RGB, r, g, b]),
            Self::Index { idx } => {
                debug_assert!(idx < 64);
                out.push(QOI_OP_INDEX | (idx & 0x3F));
            }
            Self::Diff { dr, dg, db } => {
                debug_assert!((-2..=1).contains(&dr));
                debug_assert!((-2..=1).contains(&dg));
                debug_assert!((-2..=1).contains(&db));
                let bias = |d: i8| (d + 2) as u8 & 0x03;
                out.push(QOI_OP_DIFF | bias(dr) << 4 | bias(dg) << 2 | bias(db));
            }
            Self::Luma { dg, dr_dg, db_dg } => {
                debug_assert!((-32..=31).contains(&dg));
                debug_assert!((-8..=7).contains(&dr_dg));
                debug_assert!((-8..=7).contains(&db_dg));
                let bias = |d: i8| (d + 8) as u8 & 0x0F;
                out.push(QOI_OP_LUMA | ((dg + 32) as u8 & 0x3F));
                out.push(bias(dr_dg) << 4 | bias(db_dg));
            }
            Self::Run { len } => {
                debug_assert!((1..=MAX_RUN).contains(&len));
                out.push(QOI_OP_RUN | (len - 1));
            }
        }
    }

    /// Parse one chunk starting at `bytes[pos]`.
    ///
    /// Returns the chunk and its encoded length. `base` is added to error
    /// offsets so they point into the whole stream rather than the payload.
    pub fn parse(bytes: &[u8], pos: usize, base: usize) -> Result<(Self, usize), DecodeError> {
        let truncated = || DecodeError::TruncatedStream { offset: base + pos };

        let b1 = *bytes.get(pos).ok_or_else(truncated)?;
        let chunk = match b1 {
            QOI_OP_RGBA => {
                let [r, g, b, a] = take::<4>(bytes, pos + 1).ok_or_else(truncated)?;
                Self::Rgba { r, g, b, a }
            }
            QOI_OP_RGB => {
                let [r, g, b] = take::<3>(bytes, pos + 1).ok_or_else(truncated)?;
                Self::Rgb { r, g, b }
            }
            _ => match b1 & QOI_MASK_2 {
                QOI_OP_INDEX => Self::Index { idx: b1 & 0x3F },
                QOI_OP_DIFF => Self::Diff {
                    dr: ((b1 >> 4) & 0x03) as i8 - 2,
                    dg: ((b1 >> 2) & 0x03) as i8 - 2,
                    db: (b1 & 0x03) as i8 - 2,
                },
                QOI_OP_LUMA => {
                    let b2 = *bytes.get(pos + 1).ok_or_else(truncated)?;
                    Self::Luma {
                        dg: (b1 & 0x3F) as i8 - 32,
                        dr_dg: (b2 >> 4) as i8 - 8,
                        db_dg: (b2 & 0x0F) as i8 - 8,
                    }
                }
                _ => Self::Run {
                    len: (b1 & 0x3F) + 1,
                },
            },
        };
        Ok((chunk, chunk.encoded_len()))
    }
}

#[inline]
fn take<const N: usize>(bytes: &[u8], pos: usize) -> Option<[u8; N]> {
    bytes.get(pos..)?.first_chunk::<N>().copied()
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Rgb { r, g, b } => write!(f, "RGB   ({r}, {g}, {b})"),
            Self::Rgba { r, g, b, a } => write!(f, "RGBA  ({r}, {g}, {b}, {a})"),
            Self::Index { idx } => write!(f, "INDEX {idx}"),
            Self::Diff { dr, dg, db } => write!(f, "DIFF  dr={dr} dg={dg} db={db}"),
            Self::Luma { dg, dr_dg, db_dg } => {
                write!(f, "LUMA  dg={dg} dr-dg={dr_dg} db-dg={db_dg}")
            }
            Self::Run { len } => write!(f, "RUN   x{len}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Chunk iterator
// ---------------------------------------------------------------------------

/// Iterates over the chunks of a payload without interpreting them.
///
/// Yields `(offset, chunk)` where `offset` is relative to the start of the
/// whole stream. Stops after the first error.
pub struct ChunkIterator<'a> {
    payload: &'a [u8],
    pos: usize,
    base: usize,
    failed: bool,
}

impl<'a> ChunkIterator<'a> {
    /// `base` is the stream offset of `payload[0]` (normally the header length).
    pub fn new(payload: &'a [u8], base: usize) -> Self {
        Self {
            payload,
            pos: 0,
            base,
            failed: false,
        }
    }

    /// Offset of the next unread byte, relative to the payload.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for ChunkIterator<'_> {
    type Item = Result<(usize, Chunk), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.payload.len() {
            return None;
        }
        let offset = self.base + self.pos;
        match Chunk::parse(self.payload, self.pos, self.base) {
            Ok((chunk, len)) => {
                self.pos += len;
                Some(Ok((offset, chunk)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
