#![no_main]
use libfuzzer_sys::fuzz_target;
use oxiqoi::qoi::{ChunkDecoder, ChunkEncoder, ChunkIterator, Pixel};

fuzz_target!(|data: &[u8]| {
    // Drive the chunk state machines directly, without any framing.
    let pixels: Vec<Pixel> = data
        .chunks_exact(4)
        .map(|c| Pixel::rgba(c[0], c[1], c[2], c[3]))
        .collect();
    if pixels.is_empty() {
        return;
    }

    let mut payload = Vec::new();
    let mut enc = ChunkEncoder::new();
    for &p in &pixels {
        enc.push(p, &mut payload);
    }
    enc.finish(&mut payload);

    let mut dec = ChunkDecoder::new();
    let mut out = Vec::with_capacity(pixels.len());
    for item in ChunkIterator::new(&payload, 0) {
        let (_, chunk) = item.unwrap();
        let p = dec.apply(chunk);
        out.extend(std::iter::repeat_n(p, chunk.pixel_count() as usize));
    }
    assert_eq!(out, pixels);
    assert_eq!(enc.stats().payload_bytes() as usize, payload.len());
});
