#![no_main]
use libfuzzer_sys::fuzz_target;
use oxiqoi::Descriptor;

fuzz_target!(|data: &[u8]| {
    if let Ok(d) = Descriptor::read(data) {
        assert_eq!(Descriptor::read(&d.to_bytes()).unwrap(), d);
    }

    let text = String::from_utf8_lossy(data);
    let mut args = Vec::<String>::new();
    for token in text.split_whitespace().take(32) {
        args.push(token.to_string());
    }
    oxiqoi::cli::fuzz_try_parse_args(&args);
});
