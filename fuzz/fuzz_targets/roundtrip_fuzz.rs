#![no_main]
use libfuzzer_sys::fuzz_target;
use oxiqoi::Raster;

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // First byte: channels and colorspace. Second: width. Rest: pixels.
    let flags = data[0];
    let channels = if flags & 1 == 0 { 3 } else { 4 };
    let colorspace = (flags >> 1) & 1;
    let width = u32::from(data[1] % 32) + 1;

    let payload = &data[2..];
    let row = width as usize * usize::from(channels);
    let height = payload.len() / row;
    if height == 0 {
        return;
    }
    let pixels = &payload[..height * row];

    let raster = Raster::from_interleaved(width, height as u32, channels, pixels).unwrap();
    let bytes = oxiqoi::encode(&raster, colorspace).unwrap();
    let decoded = oxiqoi::decode(&bytes).unwrap();
    assert_eq!(decoded, raster);
});
