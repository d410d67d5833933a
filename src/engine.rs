// Codec engine: the call boundary used by collaborators.
//
// Each call owns a fresh color cache and previous-pixel register, so calls
// on different images never share state. With the `parallel` feature the
// batch helpers fan independent images out over rayon's pool.

use crate::qoi::decoder::{self, DecodeError};
use crate::qoi::encoder::{self, ChunkStats, EncodeError};
use crate::qoi::header::{Descriptor, FormatError};
use crate::raster::Raster;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Encode `raster` as a QOI stream. `colorspace` must be 0 or 1.
pub fn encode(raster: &Raster, colorspace: u8) -> Result<Vec<u8>, EncodeError> {
    encoder::encode_memory(raster, colorspace)
}

/// Encode and also report how many chunks of each kind were emitted.
pub fn encode_with_stats(
    raster: &Raster,
    colorspace: u8,
) -> Result<(Vec<u8>, ChunkStats), EncodeError> {
    encoder::encode_memory_with_stats(raster, colorspace)
}

/// Decode a complete QOI stream.
pub fn decode(bytes: &[u8]) -> Result<Raster, DecodeError> {
    decoder::decode_memory(bytes)
}

/// Decode a complete QOI stream, also returning its header.
///
/// The header is parsed once; the colorspace flag is only available here.
pub fn decode_with_descriptor(bytes: &[u8]) -> Result<(Descriptor, Raster), DecodeError> {
    decoder::decode_frame(bytes)
}

/// Parse only the header of a stream.
pub fn read_descriptor(bytes: &[u8]) -> Result<Descriptor, FormatError> {
    Descriptor::read(bytes)
}

/// Encode several images concurrently. Results keep the input order.
#[cfg(feature = "parallel")]
pub fn encode_batch(rasters: &[Raster], colorspace: u8) -> Vec<Result<Vec<u8>, EncodeError>> {
    rasters.par_iter().map(|r| encode(r, colorspace)).collect()
}

/// Decode several streams concurrently. Results keep the input order.
#[cfg(feature = "parallel")]
pub fn decode_batch(streams: &[&[u8]]) -> Vec<Result<Raster, DecodeError>> {
    streams.par_iter().map(|s| decode(s)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
