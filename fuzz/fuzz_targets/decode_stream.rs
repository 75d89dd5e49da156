#![no_main]

use arbitrary::Arbitrary;
use cstream_decoder::{DecoderConfig, StreamDecoder, TreeBuildingSink};
use libfuzzer_sys::fuzz_target;

// Fuzz target: StreamDecoder over arbitrary bytes and read sizes.
//
// The decoder must return an error or a tree, never panic, and never read
// past the declared length.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    read_block_size: u8,
    declared_slack: i8,
    stream: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let declared = (input.stream.len() as i64 + i64::from(input.declared_slack)).max(0) as u64;
    let mut decoder = StreamDecoder::new(&input.stream[..], declared, TreeBuildingSink::new())
        .with_config(DecoderConfig {
            read_block_size: usize::from(input.read_block_size).max(1),
            max_header_size: 1024,
        });
    let _ = decoder.decode();
    assert!(decoder.bytes_read() <= declared);
});
