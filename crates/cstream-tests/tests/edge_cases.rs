//! Edge case integration tests for the decoder and encoder.
//!
//! - **Truncation**: every proper prefix of a valid stream must fail with
//!   `TruncatedStream`, whether the source runs dry or the declared length
//!   is too short. A partial tree is never reported as complete.
//! - **Backpressure**: a sink that defers every byte until the end of each
//!   file still sees every byte exactly once and in order.
//! - **Empty parts**: empty containers and zero-byte files.
//! - **Malformed input**: headers that are neither container nor file,
//!   missing parameters.
//! - **Foreign framing**: preambles, epilogues and broken delimiters are
//!   skipped the way MIME readers skip them.

use cstream_decoder::{ContainerEventSink, DecodeError, DecoderConfig, StreamDecoder, decode_tree};
use cstream_encoder::{EncodeError, StreamEncoder};
use cstream_tests::{OCTET, StubbornSink, encode, expected_files, job42, varied_tree};
use cstream_types::{Container, FileEntry};
use cstream_wire::WireError;

fn decode_err(stream: &[u8], declared: u64) -> DecodeError {
    decode_tree(stream, declared, DecoderConfig::default()).expect_err("decode should fail")
}

// ── Truncation ────────────────────────────────────────────────────────────────

#[test]
fn every_prefix_is_truncated() {
    let stream = encode(&job42(), 4);
    for cut in 0..stream.len() {
        let err = decode_err(&stream[..cut], stream.len() as u64);
        assert!(
            matches!(err, DecodeError::TruncatedStream { .. }),
            "cut at {cut}: {err:?}"
        );
    }
}

#[test]
fn short_declared_length_is_truncated() {
    let stream = encode(&job42(), 4);
    for declared in [0, 1, 98, 99, 200, 471] {
        let err = decode_err(&stream, declared);
        assert!(
            matches!(err, DecodeError::TruncatedStream { declared_len, .. } if declared_len == declared),
            "declared {declared}: {err:?}"
        );
    }
}

#[test]
fn truncated_before_final_delimiter_reports_counts() {
    let stream = encode(&job42(), 4);
    let cut = stream.len() - 16;
    match decode_err(&stream[..cut], stream.len() as u64) {
        DecodeError::TruncatedStream {
            bytes_read,
            declared_len,
        } => {
            assert_eq!(bytes_read, cut as u64);
            assert_eq!(declared_len, stream.len() as u64);
        }
        other => panic!("unexpected {other:?}"),
    }
}

// ── Backpressure ──────────────────────────────────────────────────────────────

#[test]
fn deferring_sink_gets_every_byte_once() {
    for seed in [1, 2, 5] {
        let root = varied_tree(seed);
        let stream = encode(&root, seed);
        for block in [17, 4096] {
            let sink = StubbornSink::default();
            let mut decoder = StreamDecoder::new(&stream[..], stream.len() as u64, sink)
                .with_config(DecoderConfig {
                    read_block_size: block,
                    ..DecoderConfig::default()
                });
            decoder.decode().unwrap();
            let sink = decoder.into_sink();
            assert_eq!(sink.inner.files, expected_files(&root), "seed {seed} block {block}");
            assert_eq!(sink.inner.data_calls, root.file_count());
        }
    }
}

// ── Empty parts ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct EventLog(Vec<String>);

impl ContainerEventSink for EventLog {
    fn start_container(&mut self, name: &str) -> std::io::Result<()> {
        self.0.push(format!("start {name}"));
        Ok(())
    }
    fn end_container(&mut self) -> std::io::Result<()> {
        self.0.push("end".into());
        Ok(())
    }
    fn start_file(&mut self, name: &str, _mime_type: &str) -> std::io::Result<()> {
        self.0.push(format!("file {name}"));
        Ok(())
    }
    fn handle_data(&mut self, data: &[u8], more_expected: bool) -> std::io::Result<usize> {
        self.0.push(format!("data {} more={more_expected}", data.len()));
        Ok(data.len())
    }
    fn end_file(&mut self) -> std::io::Result<()> {
        self.0.push("end file".into());
        Ok(())
    }
}

fn events(root: &Container) -> Vec<String> {
    let stream = encode(root, 12);
    let mut decoder = StreamDecoder::new(&stream[..], stream.len() as u64, EventLog::default());
    decoder.decode().unwrap();
    decoder.into_sink().0
}

#[test]
fn empty_container_has_nothing_between_start_and_end() {
    assert_eq!(events(&Container::new("void")), ["start void", "end"]);
}

#[test]
fn zero_byte_file_gets_one_final_data_call() {
    let root = Container::new("c").with_file(FileEntry::from_bytes("empty", OCTET, Vec::new()));
    assert_eq!(
        events(&root),
        ["start c", "file empty", "data 0 more=false", "end file", "end"]
    );
}

// ── Malformed input ───────────────────────────────────────────────────────────

#[test]
fn container_without_boundary() {
    let stream = b"MIME-Version: 1.0\r\nContent-Type: multipart/mixed; container_name=\"c\"\r\n\r\n";
    let err = decode_err(stream, stream.len() as u64);
    assert!(matches!(
        err,
        DecodeError::MalformedHeader {
            offset: 0,
            source: WireError::MissingContainerParam { param: "boundary" }
        }
    ));
}

#[test]
fn container_without_name() {
    let stream = b"Content-Type: multipart/mixed; boundary=\"abc\"\r\n\r\n\r\n--abc--";
    let err = decode_err(stream, stream.len() as u64);
    assert!(matches!(
        err,
        DecodeError::MalformedHeader {
            source: WireError::MissingContainerParam {
                param: "container_name"
            },
            ..
        }
    ));
}

#[test]
fn part_that_is_neither_container_nor_file() {
    let stream = b"Content-Type: multipart/mixed; container_name=\"c\"; boundary=\"abc\"\r\n\r\n\r\n--abc\r\nX-Note: hi\r\n\r\n\r\n--abc--";
    let err = decode_err(stream, stream.len() as u64);
    assert!(matches!(
        err,
        DecodeError::MalformedHeader {
            source: WireError::UnknownPart,
            ..
        }
    ));
}

#[test]
fn broken_delimiter_turns_the_part_into_preamble() {
    let mut stream = encode(&job42(), 4);
    // Corrupt the first delimiter after the root headers; everything up to
    // the next intact root delimiter is then text outside any part.
    stream[100] = b'X';
    let root = decode_tree(&stream[..], stream.len() as u64, DecoderConfig::default()).unwrap();
    assert_eq!(root.outline(), "job42/\n  a.bin (application/octet-stream, 7 bytes)");
}

#[test]
fn foreign_preamble_and_epilogue() {
    let mut stream = b"MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; container_name=\"mail\"; boundary=\"=_outer\"\r\n\r\n\
This is a multi-part message in MIME format.\r\n\
--=_outer\r\n\
Content-Type: multipart/mixed; container_name=\"att\"; boundary=\"=_inner\"\r\n\r\n\
--=_inner\r\n\
Content-Type: text/plain\r\n\
Content-Disposition: attachment; filename=\"note.txt\"\r\n\r\n\
hi\r\n\
--=_inner--\r\n\
inner epilogue\r\n\
--=_outer--\r\n"
        .to_vec();
    stream.extend_from_slice(b"outer epilogue");

    let root = decode_tree(&stream[..], stream.len() as u64, DecoderConfig::default()).unwrap();
    assert_eq!(root.outline(), "mail/\n  att/\n    note.txt (text/plain, 2 bytes)");
}

#[test]
fn header_block_limit() {
    let stream = encode(&Container::new("n".repeat(300)), 1);
    let err = StreamDecoder::new(&stream[..], stream.len() as u64, ())
        .with_config(DecoderConfig {
            read_block_size: 64,
            max_header_size: 256,
        })
        .decode()
        .unwrap_err();
    assert!(matches!(err, DecodeError::HeaderTooLarge { limit: 256, .. }));
}

// ── Encoder contract ──────────────────────────────────────────────────────────

#[test]
fn encoder_refuses_quotes_and_newlines() {
    for bad in ["a\"b", "line\r\nbreak", ""] {
        let root = Container::new("ok").with_file(FileEntry::placeholder(bad, OCTET, 0));
        assert!(
            matches!(StreamEncoder::new(&root, Vec::new()), Err(EncodeError::InvalidName(_))),
            "{bad:?}"
        );
    }
}

#[test]
fn encoder_rejects_out_of_order_calls() {
    let root = job42();
    let mut enc = StreamEncoder::new(&root, Vec::new()).unwrap();
    assert!(matches!(
        enc.start_next_file().unwrap_err(),
        EncodeError::ProtocolViolation(_)
    ));
    assert!(matches!(
        enc.end_container().unwrap_err(),
        EncodeError::ProtocolViolation(_)
    ));
}
