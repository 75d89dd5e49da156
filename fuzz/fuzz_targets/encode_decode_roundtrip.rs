#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use cstream_decoder::{DecoderConfig, decode_tree};
use cstream_encoder::{StreamEncoder, compute_total_size};
use cstream_types::{Container, FileEntry};
use libfuzzer_sys::fuzz_target;

// Fuzz target: arbitrary tree → encode → decode.
//
// Checks that the emitted length equals the prediction and that the
// decoded structure equals the input. Trees with names the encoder
// refuses are skipped.
#[derive(Debug, Arbitrary)]
struct FuzzFile {
    name: String,
    mime_type: String,
    data: Vec<u8>,
}

#[derive(Debug)]
struct FuzzTree(Container);

impl<'a> Arbitrary<'a> for FuzzTree {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self(container(u, 0)?))
    }
}

fn container(u: &mut Unstructured<'_>, depth: u32) -> arbitrary::Result<Container> {
    let mut c = Container::new(String::arbitrary(u)?);
    if depth < 4 {
        for _ in 0..u.int_in_range(0..=3)? {
            c.add_container(container(u, depth + 1)?);
        }
    }
    for _ in 0..u.int_in_range(0..=4)? {
        let f = FuzzFile::arbitrary(u)?;
        c.add_file(FileEntry::from_bytes(f.name, f.mime_type, f.data));
    }
    Ok(c)
}

fuzz_target!(|input: (FuzzTree, u64)| {
    let (FuzzTree(root), seed) = input;
    let Ok(encoder) = StreamEncoder::new(&root, Vec::new()) else {
        return;
    };
    let (bytes, written) = encoder.with_seed(seed).encode_all().expect("encode");
    assert_eq!(written, compute_total_size(&root));
    assert_eq!(bytes.len() as u64, written);

    // File data may legitimately contain a delimiter by chance; only a
    // successful decode is compared.
    if let Ok(decoded) = decode_tree(&bytes[..], written, DecoderConfig::default()) {
        assert!(decoded.same_structure(&root));
    }
});
