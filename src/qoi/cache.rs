// QOI color cache.
//
// A direct-mapped table of 64 previously seen pixels. The slot for a pixel
// is `Pixel::hash_index`; a write silently replaces whatever occupied the
// slot. There is no probing or chaining: the encoder and decoder stay in
// sync only because both apply the exact same sequence of stores.

use super::pixel::Pixel;

/// Number of cache slots.
pub const CACHE_SIZE: usize = 64;

/// Direct-mapped color cache shared (in lockstep) by encoder and decoder.
#[derive(Debug, Clone)]
pub struct ColorCache {
    slots: [Pixel; CACHE_SIZE],
}

impl Default for ColorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorCache {
    /// Fresh cache, every slot `(0, 0, 0, 0)`.
    pub fn new() -> Self {
        Self {
            slots: [Pixel::TRANSPARENT; CACHE_SIZE],
        }
    }

    /// Reset all slots to `(0, 0, 0, 0)`.
    pub fn reset(&mut self) {
        self.slots.fill(Pixel::TRANSPARENT);
    }

    /// Slot index for `pixel`, in `0..64`.
    #[inline]
    pub fn index(pixel: Pixel) -> u8 {
        pixel.hash_index() as u8
    }

    /// Pixel currently stored at `idx`. Only the low 6 bits of `idx` are used.
    #[inline]
    pub fn lookup(&self, idx: u8) -> Pixel {
        self.slots[idx as usize & (CACHE_SIZE - 1)]
    }

    /// Overwrite slot `idx`.
    #[inline]
    pub fn store(&mut self, idx: u8, pixel: Pixel) {
        self.slots[idx as usize & (CACHE_SIZE - 1)] = pixel;
    }

    /// Store `pixel` at its own hash slot.
    #[inline]
    pub fn insert(&mut self, pixel: Pixel) {
        self.store(Self::index(pixel), pixel);
    }

    /// Whether the slot for `pixel` already holds exactly `pixel`.
    /// Returns the slot index on a hit.
    #[inline]
    pub fn find(&self, pixel: Pixel) -> Option<u8> {
        let idx = Self::index(pixel);
        (self.lookup(idx) == pixel).then_some(idx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_transparent() {
        let cache = ColorCache::new();
        for i in 0..CACHE_SIZE as u8 {
            assert_eq!(cache.lookup(i), Pixel::TRANSPARENT);
        }
        // Transparent black hashes to slot 0, which already holds it.
        assert_eq!(cache.find(Pixel::TRANSPARENT), Some(0));
        assert_eq!(cache.find(Pixel::OPAQUE_BLACK), None);
    }

    #[test]
    fn store_and_lookup() {
        let mut cache = ColorCache::new();
        let p = Pixel::rgb(10, 20, 30);
        cache.insert(p);
        assert_eq!(cache.lookup(ColorCache::index(p)), p);
        assert_eq!(cache.find(p), Some(9));
    }

    #[test]
    fn collision_last_writer_wins() {
        let mut cache = ColorCache::new();
        // (64,0,0,0) -> 192 % 64 = 0, same slot as transparent black.
        let a = Pixel::rgba(64, 0, 0, 0);
        let b = Pixel::rgba(0, 0, 0, 64);
        assert_eq!(ColorCache::index(a), ColorCache::index(b));

        cache.insert(a);
        assert_eq!(cache.find(a), Some(0));
        cache.insert(b);
        assert_eq!(cache.find(a), None);
        assert_eq!(cache.find(b), Some(0));
    }

    #[test]
    fn reset_clears() {
        let mut cache = ColorCache::new();
        cache.insert(Pixel::rgb(1, 2, 3));
        cache.reset();
        assert_eq!(cache.find(Pixel::rgb(1, 2, 3)), None);
    }
}
