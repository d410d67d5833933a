#![no_main]
use libfuzzer_sys::fuzz_target;
use oxiqoi::qoi::header::{HEADER_LEN, QOI_TRAILER};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes: must return an error or a raster, never panic.
    if let Ok(raster) = oxiqoi::decode(data) {
        assert_eq!(raster.pixels.len() as u64, raster.pixel_count());
    }

    // Wrap the input in a plausible frame so the chunk grammar gets exercised.
    if data.len() >= 2 {
        let mut framed = Vec::with_capacity(HEADER_LEN + data.len() + QOI_TRAILER.len());
        framed.extend_from_slice(b"qoif");
        framed.extend_from_slice(&u32::from(data[0] % 64 + 1).to_be_bytes());
        framed.extend_from_slice(&u32::from(data[1] % 64 + 1).to_be_bytes());
        framed.extend_from_slice(&[4, 0]);
        framed.extend_from_slice(&data[2..]);
        framed.extend_from_slice(&QOI_TRAILER);
        let _ = oxiqoi::decode(&framed);
    }
});
