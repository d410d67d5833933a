// In-memory pixel raster exchanged with callers.
//
// Pixels are always held as RGBA. A 3-channel raster keeps its declared
// channel count so the header round-trips, and every alpha is 255: the
// constructors set it, `validate` rejects anything else.

use crate::qoi::header::{self, ValidationError};
use crate::qoi::pixel::Pixel;

/// Row-major image: `pixels.len() == width * height`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    /// Declared channel count, 3 or 4.
    pub channels: u8,
    pub pixels: Vec<Pixel>,
}

impl Raster {
    /// Build a raster, validating dimensions, channels and pixel count.
    ///
    /// For 3 channels every pixel's alpha is set to 255.
    pub fn new(
        width: u32,
        height: u32,
        channels: u8,
        mut pixels: Vec<Pixel>,
    ) -> Result<Self, ValidationError> {
        if channels == 3 {
            for p in &mut pixels {
                p.a = 255;
            }
        }
        let raster = Self {
            width,
            height,
            channels,
            pixels,
        };
        raster.validate()?;
        Ok(raster)
    }

    /// A raster where every pixel is `pixel` (opaque for 3 channels).
    pub fn filled(
        width: u32,
        height: u32,
        channels: u8,
        pixel: Pixel,
    ) -> Result<Self, ValidationError> {
        header::validate_dimensions(width, height)?;
        header::validate_channels(channels)?;
        let count = (u64::from(width) * u64::from(height)) as usize;
        let pixel = if channels == 3 { pixel.with_alpha(255) } else { pixel };
        Ok(Self {
            width,
            height,
            channels,
            pixels: vec![pixel; count],
        })
    }

    /// Build from interleaved `RGB` or `RGBA` bytes.
    ///
    /// For 3-channel input every pixel gets alpha 255.
    pub fn from_interleaved(
        width: u32,
        height: u32,
        channels: u8,
        data: &[u8],
    ) -> Result<Self, ValidationError> {
        header::validate_dimensions(width, height)?;
        header::validate_channels(channels)?;

        let expected = u64::from(width) * u64::from(height) * u64::from(channels);
        if data.len() as u64 != expected {
            return Err(ValidationError::BadBufferLength {
                expected,
                actual: data.len() as u64,
            });
        }

        let pixels = match channels {
            3 => data
                .chunks_exact(3)
                .map(|c| Pixel::rgb(c[0], c[1], c[2]))
                .collect(),
            _ => data
                .chunks_exact(4)
                .map(|c| Pixel::rgba(c[0], c[1], c[2], c[3]))
                .collect(),
        };

        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// Interleaved bytes in the declared channel layout (alpha dropped for 3).
    pub fn to_interleaved(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * usize::from(self.channels));
        for p in &self.pixels {
            if self.channels == 3 {
                out.extend_from_slice(&[p.r, p.g, p.b]);
            } else {
                out.extend_from_slice(&[p.r, p.g, p.b, p.a]);
            }
        }
        out
    }

    #[inline]
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Pixel at column `x`, row `y`.
    pub fn get(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.width as usize + x as usize;
        self.pixels.get(i).copied()
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Pixel]> {
        self.pixels.chunks_exact(self.width.max(1) as usize)
    }

    /// Check dimensions, channel count, that the pixel vector matches, and
    /// that a 3-channel raster is fully opaque.
    pub fn validate(&self) -> Result<(), ValidationError> {
        header::validate_dimensions(self.width, self.height)?;
        header::validate_channels(self.channels)?;
        let expected = self.pixel_count();
        let actual = self.pixels.len() as u64;
        if actual != expected {
            return Err(ValidationError::PixelCountMismatch { expected, actual });
        }
        if self.channels == 3
            && let Some(index) = self.pixels.iter().position(|p| p.a != 255)
        {
            return Err(ValidationError::TranslucentRgbPixel {
                index: index as u64,
                alpha: self.pixels[index].a,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
