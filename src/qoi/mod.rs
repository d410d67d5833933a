// QOI ("Quite OK Image") format implementation.
//
// # Modules
//
// - `pixel`  : RGBA pixel value type, wrapping channel arithmetic, cache hash
// - `cache`  : 64-slot direct-mapped color cache
// - `chunk`  : Chunk grammar: opcode constants, parse/serialize, iterator
// - `header` : 14-byte descriptor and 8-byte end marker
// - `encoder`: Per-pixel opcode selection
// - `decoder`: Per-chunk dispatch and raster reconstruction

pub mod cache;
pub mod chunk;
pub mod decoder;
pub mod encoder;
pub mod header;
pub mod pixel;

// Re-export key types for convenience.
pub use cache::ColorCache;
pub use chunk::{Chunk, ChunkIterator};
pub use decoder::{ChunkDecoder, DecodeError, decode_frame, decode_memory};
pub use encoder::{ChunkEncoder, ChunkStats, EncodeError, encode_memory};
pub use header::{Colorspace, Descriptor, FormatError, QOI_MAGIC, QOI_TRAILER, ValidationError};
pub use pixel::Pixel;
