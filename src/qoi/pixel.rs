// RGBA pixel value type.
//
// All channel arithmetic is modulo 256. DIFF/LUMA reconstruction adds signed
// deltas with u8 wrapping so that e.g. 255 + 1 == 0 and 0 - 2 == 254.

/// A single RGBA pixel. Channels are unassociated (not premultiplied).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    /// Opaque black, the initial previous-pixel value of every call.
    pub const OPAQUE_BLACK: Pixel = Pixel::rgba(0, 0, 0, 255);

    /// Fully transparent black, the initial value of every cache slot.
    pub const TRANSPARENT: Pixel = Pixel::rgba(0, 0, 0, 0);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// RGB pixel with implicit opaque alpha.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Same color, different alpha.
    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Color cache slot for this pixel: `(r*3 + g*5 + b*7 + a*11) % 64`.
    ///
    /// Encoder and decoder must agree on this bit-for-bit.
    #[inline]
    pub const fn hash_index(self) -> usize {
        (self.r as usize * 3 + self.g as usize * 5 + self.b as usize * 7 + self.a as usize * 11)
            % 64
    }

    /// Add signed RGB deltas with wrapping, keeping alpha.
    #[inline]
    pub const fn offset(self, dr: i8, dg: i8, db: i8) -> Self {
        Self {
            r: self.r.wrapping_add_signed(dr),
            g: self.g.wrapping_add_signed(dg),
            b: self.b.wrapping_add_signed(db),
            a: self.a,
        }
    }

    /// Wrapped RGB differences `self - prev`, each reinterpreted as i8.
    #[inline]
    pub const fn delta(self, prev: Pixel) -> (i8, i8, i8) {
        (
            self.r.wrapping_sub(prev.r) as i8,
            self.g.wrapping_sub(prev.g) as i8,
            self.b.wrapping_sub(prev.b) as i8,
        )
    }
}

impl From<[u8; 4]> for Pixel {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
}

impl From<[u8; 3]> for Pixel {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<Pixel> for [u8; 4] {
    fn from(p: Pixel) -> Self {
        [p.r, p.g, p.b, p.a]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_formula() {
        assert_eq!(Pixel::TRANSPARENT.hash_index(), 0);
        // 255 * 11 = 2805, 2805 % 64 = 53
        assert_eq!(Pixel::OPAQUE_BLACK.hash_index(), 53);
        // 10*3 + 20*5 + 30*7 + 255*11 = 3145, 3145 % 64 = 9
        assert_eq!(Pixel::rgb(10, 20, 30).hash_index(), 9);
        let white = Pixel::rgba(255, 255, 255, 255);
        assert_eq!(white.hash_index(), (255 * 26) % 64);
    }

    #[test]
    fn hash_is_deterministic() {
        let p = Pixel::rgba(12, 200, 7, 99);
        assert_eq!(p.hash_index(), p.hash_index());
        assert!(p.hash_index() < 64);
    }

    #[test]
    fn offset_wraps() {
        let p = Pixel::rgba(0, 255, 1, 7);
        let q = p.offset(-2, 1, -1);
        assert_eq!(q, Pixel::rgba(254, 0, 0, 7));
    }

    #[test]
    fn delta_wraps_to_small_signed() {
        let prev = Pixel::rgb(255, 0, 128);
        let cur = Pixel::rgb(0, 254, 100);
        assert_eq!(cur.delta(prev), (1, -2, -28));
        assert_eq!(prev.offset(1, -2, -28), cur);
    }

    #[test]
    fn array_conversions() {
        let p: Pixel = [1, 2, 3].into();
        assert_eq!(p.a, 255);
        let raw: [u8; 4] = Pixel::rgba(1, 2, 3, 4).into();
        assert_eq!(raw, [1, 2, 3, 4]);
    }
}
