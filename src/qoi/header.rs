// QOI header (descriptor) and end-marker framing.
//
// Layout:
//   magic      4 bytes  "qoif"
//   width      u32 BE
//   height     u32 BE
//   channels   u8       3 = RGB, 4 = RGBA
//   colorspace u8       0 = sRGB with linear alpha, 1 = all channels linear
//   ...chunks...
//   trailer    7 x 0x00, 0x01

use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const QOI_MAGIC: [u8; 4] = *b"qoif";

/// End-of-stream marker.
pub const QOI_TRAILER: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];

pub const HEADER_LEN: usize = 14;
pub const TRAILER_LEN: usize = QOI_TRAILER.len();

/// Largest accepted `width * height` (2^32 / 4).
pub const MAX_PIXELS: u64 = (1 << 32) / 4;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A raster, colorspace, or descriptor field is out of range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("image dimensions {width}x{height} are empty or exceed {max} pixels", max = MAX_PIXELS)]
    EmptyOrOversizedImage { width: u32, height: u32 },

    #[error("unsupported channel count {channels} (expected 3 or 4)")]
    BadChannels { channels: u8 },

    #[error("unsupported colorspace {colorspace} (expected 0 or 1)")]
    BadColorspace { colorspace: u8 },

    #[error("raster holds {actual} pixels, dimensions require {expected}")]
    PixelCountMismatch { expected: u64, actual: u64 },

    #[error("pixel buffer is {actual} bytes, dimensions require {expected}")]
    BadBufferLength { expected: u64, actual: u64 },

    #[error("pixel {index} of a 3-channel raster has alpha {alpha}, expected 255")]
    TranslucentRgbPixel { index: u64, alpha: u8 },
}

/// The envelope around the chunk payload is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("stream is {len} bytes, shorter than header plus end marker")]
    TooShort { len: usize },

    #[error("invalid QOI magic: expected \"qoif\", got {found:02X?}")]
    BadMagic { found: [u8; 4] },

    #[error("invalid QOI end marker: got {found:02X?}")]
    BadTrailer { found: [u8; 8] },

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(#[from] ValidationError),
}

// ---------------------------------------------------------------------------
// Colorspace
// ---------------------------------------------------------------------------

/// Colorspace flag. Stored and round-tripped, never interpreted by the codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Colorspace {
    /// sRGB color channels with linear alpha.
    #[default]
    Srgb = 0,
    /// All channels linear.
    Linear = 1,
}

impl TryFrom<u8> for Colorspace {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Srgb),
            1 => Ok(Self::Linear),
            colorspace => Err(ValidationError::BadColorspace { colorspace }),
        }
    }
}

impl From<Colorspace> for u8 {
    fn from(c: Colorspace) -> Self {
        c as u8
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Parsed QOI header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub width: u32,
    pub height: u32,
    /// 3 (RGB) or 4 (RGBA).
    pub channels: u8,
    pub colorspace: Colorspace,
}

impl Descriptor {
    /// Total pixel count. Never overflows since both factors are u32.
    #[inline]
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Check dimensions and channel count.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dimensions(self.width, self.height)?;
        validate_channels(self.channels)
    }

    /// Serialize to the fixed 14-byte header.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&QOI_MAGIC);
        out[4..8].copy_from_slice(&self.width.to_be_bytes());
        out[8..12].copy_from_slice(&self.height.to_be_bytes());
        out[12] = self.channels;
        out[13] = self.colorspace.into();
        out
    }

    /// Append the header to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_bytes());
    }

    /// Parse the header at the start of `bytes`.
    ///
    /// Only the first `HEADER_LEN` bytes are examined.
    pub fn read(bytes: &[u8]) -> Result<Self, FormatError> {
        let Some(head) = bytes.first_chunk::<HEADER_LEN>() else {
            return Err(FormatError::TooShort { len: bytes.len() });
        };

        let found = [head[0], head[1], head[2], head[3]];
        if found != QOI_MAGIC {
            return Err(FormatError::BadMagic { found });
        }

        let width = u32::from_be_bytes([head[4], head[5], head[6], head[7]]);
        let height = u32::from_be_bytes([head[8], head[9], head[10], head[11]]);
        let descriptor = Self {
            width,
            height,
            channels: head[12],
            colorspace: Colorspace::try_from(head[13])?,
        };
        descriptor.validate()?;

        log::trace!(
            "qoi descriptor: {}x{} channels={} colorspace={:?}",
            descriptor.width,
            descriptor.height,
            descriptor.channels,
            descriptor.colorspace
        );
        Ok(descriptor)
    }
}

pub(crate) fn validate_dimensions(width: u32, height: u32) -> Result<(), ValidationError> {
    let pixels = u64::from(width) * u64::from(height);
    if width == 0 || height == 0 || pixels > MAX_PIXELS {
        return Err(ValidationError::EmptyOrOversizedImage { width, height });
    }
    Ok(())
}

pub(crate) fn validate_channels(channels: u8) -> Result<(), ValidationError> {
    match channels {
        3 | 4 => Ok(()),
        _ => Err(ValidationError::BadChannels { channels }),
    }
}

// ---------------------------------------------------------------------------
// Trailer
// ---------------------------------------------------------------------------

/// The fixed end marker.
#[inline]
pub fn write_trailer() -> [u8; TRAILER_LEN] {
    QOI_TRAILER
}

/// Whether `bytes` ends with the end marker.
pub fn validate_trailer(bytes: &[u8]) -> bool {
    bytes.ends_with(&QOI_TRAILER)
}

/// Split a complete stream into its descriptor and chunk payload.
///
/// Checks length, magic, descriptor fields and end marker, in that order.
pub fn split_frame(bytes: &[u8]) -> Result<(Descriptor, &[u8]), FormatError> {
    if bytes.len() < HEADER_LEN + TRAILER_LEN {
        return Err(FormatError::TooShort { len: bytes.len() });
    }
    let descriptor = Descriptor::read(bytes)?;

    let payload_end = bytes.len() - TRAILER_LEN;
    if !validate_trailer(bytes) {
        let mut found = [0u8; TRAILER_LEN];
        found.copy_from_slice(&bytes[payload_end..]);
        return Err(FormatError::BadTrailer { found });
    }

    Ok((descriptor, &bytes[HEADER_LEN..payload_end]))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Descriptor {
        Descriptor {
            width: 800,
            height: 600,
            channels: 4,
            colorspace: Colorspace::Linear,
        }
    }

    #[test]
    fn descriptor_layout_is_big_endian() {
        let bytes = Descriptor {
            width: 0x0102_0304,
            height: 0x0A0B_0C0D,
            channels: 3,
            colorspace: Colorspace::Srgb,
        }
        .to_bytes();
        assert_eq!(
            bytes,
            [b'q', b'o', b'i', b'f', 1, 2, 3, 4, 0x0A, 0x0B, 0x0C, 0x0D, 3, 0]
        );
    }

    #[test]
    fn descriptor_roundtrip() {
        let d = sample();
        assert_eq!(Descriptor::read(&d.to_bytes()).unwrap(), d);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[3] = b'g';
        assert_eq!(
            Descriptor::read(&bytes),
            Err(FormatError::BadMagic {
                found: *b"qoig"
            })
        );
    }

    #[test]
    fn short_input_rejected() {
        assert_eq!(
            Descriptor::read(b"qoif"),
            Err(FormatError::TooShort { len: 4 })
        );
    }

    #[test]
    fn invalid_fields_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[12] = 5;
        assert_eq!(
            Descriptor::read(&bytes),
            Err(FormatError::InvalidDescriptor(ValidationError::BadChannels {
                channels: 5
            }))
        );

        let mut bytes = sample().to_bytes();
        bytes[13] = 2;
        assert_eq!(
            Descriptor::read(&bytes),
            Err(FormatError::InvalidDescriptor(
                ValidationError::BadColorspace { colorspace: 2 }
            ))
        );

        let mut bytes = sample().to_bytes();
        bytes[4..8].copy_from_slice(&0u32.to_be_bytes());
        assert!(matches!(
            Descriptor::read(&bytes),
            Err(FormatError::InvalidDescriptor(
                ValidationError::EmptyOrOversizedImage { width: 0, .. }
            ))
        ));
    }

    #[test]
    fn oversized_dimensions_rejected() {
        assert!(validate_dimensions(1 << 15, 1 << 15).is_ok());
        assert!(validate_dimensions(1 << 16, 1 << 14).is_ok());
        assert_eq!(
            validate_dimensions(1 << 16, (1 << 14) + 1),
            Err(ValidationError::EmptyOrOversizedImage {
                width: 1 << 16,
                height: (1 << 14) + 1
            })
        );
        assert!(validate_dimensions(u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn trailer_checks() {
        assert_eq!(write_trailer(), QOI_TRAILER);
        assert!(validate_trailer(&[0xAA, 0, 0, 0, 0, 0, 0, 0, 1]));
        assert!(!validate_trailer(&[0, 0, 0, 0, 0, 0, 0, 2]));
        assert!(!validate_trailer(&[0, 0, 0, 1]));
    }

    #[test]
    fn split_frame_returns_payload() {
        let mut stream = Vec::new();
        sample().write(&mut stream);
        stream.extend_from_slice(&[0xC0, 0x55]);
        stream.extend_from_slice(&write_trailer());

        let (d, payload) = split_frame(&stream).unwrap();
        assert_eq!(d, sample());
        assert_eq!(payload, &[0xC0, 0x55]);
    }

    #[test]
    fn split_frame_rejects_bad_trailer() {
        let mut stream = Vec::new();
        sample().write(&mut stream);
        stream.extend_from_slice(&[0, 0, 0, 0, 0, 0, 1, 1]);
        assert_eq!(
            split_frame(&stream),
            Err(FormatError::BadTrailer {
                found: [0, 0, 0, 0, 0, 0, 1, 1]
            })
        );
    }

    #[test]
    fn colorspace_conversion() {
        assert_eq!(Colorspace::try_from(0), Ok(Colorspace::Srgb));
        assert_eq!(Colorspace::try_from(1), Ok(Colorspace::Linear));
        assert_eq!(
            Colorspace::try_from(9),
            Err(ValidationError::BadColorspace { colorspace: 9 })
        );
        assert_eq!(u8::from(Colorspace::Linear), 1);
    }
}
