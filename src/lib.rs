//! Oxiqoi: lossless QOI ("Quite OK Image") encoding/decoding in Rust.
//!
//! The crate provides:
//! - The QOI wire format: framing, chunk grammar, color cache (`qoi`)
//! - An in-memory pixel raster (`raster`)
//! - The whole-image encode/decode call boundary (`engine`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use oxiqoi::{Pixel, Raster};
//!
//! let raster = Raster::filled(2, 2, 4, Pixel::rgb(10, 20, 30)).unwrap();
//! let bytes = oxiqoi::encode(&raster, 0).unwrap();
//! let decoded = oxiqoi::decode(&bytes).unwrap();
//! assert_eq!(decoded, raster);
//! ```

pub mod engine;
pub mod io;
pub mod qoi;
pub mod raster;

#[cfg(feature = "cli")]
pub mod cli;

pub use engine::{decode, decode_with_descriptor, encode, encode_with_stats, read_descriptor};
pub use qoi::{
    ChunkStats, Colorspace, DecodeError, Descriptor, EncodeError, FormatError, Pixel,
    ValidationError,
};
pub use raster::Raster;
