#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: PartHeaders::parse + classify with arbitrary bytes.
//
// Catches bugs in:
// - Header line splitting and folding
// - Parameter and quoted-string parsing
// - Boundary token validation
fuzz_target!(|data: &[u8]| {
    if let Ok(headers) = cstream_wire::PartHeaders::parse(data) {
        let _ = headers.classify();
    }
});
