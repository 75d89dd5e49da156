use std::io::{self, Read};
use std::time::{Duration, Instant};

use cstream_types::Container;
use cstream_wire::{Boundary, CRLF, HEADER_TERMINATOR, PartHeaders, PartKind};
use log::{debug, info};

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::sink::ContainerEventSink;
use crate::tree_sink::TreeBuildingSink;

/// Parser state. Exactly one is active at a time.
///
/// ```text
///              container part
///   Headers ───────────────────► Delimiter ◄──────────┐
///      ▲  │ file part                │  │ final        │ pop level,
///      │  ▼                          │  └──────────────┘ parent still open
///      │  Data ── terminator ───────►│
///      └──────── delimiter ──────────┘
///                                    │ final, no level left
///                                    ▼
///                                   Done
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParseState {
    Headers,
    Delimiter,
    Data,
    Done,
}

enum Progress {
    /// The state machine moved; try again with the current buffer.
    Continue,
    /// The buffer holds nothing more to act on; read from the source.
    NeedMore,
}

/// One open container level: its boundary and the `CRLF--boundary` prefix
/// shared by both delimiter forms.
struct Level {
    boundary: Boundary,
    terminator: Vec<u8>,
}

/// Outcome of scanning the buffer for the current level's delimiter. The
/// offsets give where the delimiter starts.
enum DelimiterMatch {
    More(usize),
    Last(usize),
    /// The delimiter prefix is buffered but the bytes after it are not.
    Partial(usize),
    Absent,
}

/// Counters collected during a decode. Diagnostics only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub bytes_read: u64,
    pub declared_len: u64,
    pub read_time: Duration,
    pub containers: usize,
    pub files: usize,
}

/// Incremental parser turning a container stream into sink events.
///
/// The decoder pulls at most [`DecoderConfig::read_block_size`] bytes per
/// `read` call and never more than `declared_len` bytes in total. It only
/// buffers the unconsumed tail of what it has read (plus whatever the sink
/// hands back), so memory use does not depend on file sizes. Nesting is
/// tracked with an explicit stack of boundaries whose depth always equals
/// the number of open containers.
///
/// ```rust,no_run
/// use cstream_decoder::{StreamDecoder, TreeBuildingSink};
///
/// # fn run(body: impl std::io::Read, content_length: u64) -> Result<(), cstream_decoder::DecodeError> {
/// let mut decoder = StreamDecoder::new(body, content_length, TreeBuildingSink::new());
/// decoder.decode()?;
/// let root = decoder.into_sink().into_root();
/// # Ok(())
/// # }
/// ```
pub struct StreamDecoder<R, S> {
    source: R,
    sink: S,
    config: DecoderConfig,
    declared_len: u64,
    state: ParseState,
    /// Bytes read but not yet consumed.
    buf: Vec<u8>,
    /// Scratch space for a single read.
    chunk: Vec<u8>,
    /// In `Data`, no terminator can start before this offset of `buf`.
    scanned: usize,
    levels: Vec<Level>,
    bytes_read: u64,
    read_time: Duration,
    containers: usize,
    files: usize,
}

impl<R: Read, S: ContainerEventSink> StreamDecoder<R, S> {
    /// Create a decoder over `source`, which is expected to carry
    /// `declared_len` bytes (the transport's content length).
    pub fn new(source: R, declared_len: u64, sink: S) -> Self {
        Self {
            source,
            sink,
            config: DecoderConfig::default(),
            declared_len,
            state: ParseState::Headers,
            buf: Vec::new(),
            chunk: Vec::new(),
            scanned: 0,
            levels: Vec::new(),
            bytes_read: 0,
            read_time: Duration::ZERO,
            containers: 0,
            files: 0,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Run until the outermost container's final delimiter.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`]; the decode is abandoned at that point and the
    /// sink keeps whatever it received.
    pub fn decode(&mut self) -> Result<DecodeStats, DecodeError> {
        while self.state != ParseState::Done {
            match self.advance()? {
                Progress::Continue => {}
                Progress::NeedMore => self.fill()?,
            }
        }

        info!(
            "decoded {} containers and {} files; bytes expected/received: {}/{}",
            self.containers, self.files, self.declared_len, self.bytes_read
        );
        Ok(self.stats())
    }

    pub fn stats(&self) -> DecodeStats {
        DecodeStats {
            bytes_read: self.bytes_read,
            declared_len: self.declared_len,
            read_time: self.read_time,
            containers: self.containers,
            files: self.files,
        }
    }

    /// Bytes pulled from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Time spent inside the source's `read`.
    pub fn read_time(&self) -> Duration {
        self.read_time
    }

    /// Whether the outermost container has been closed.
    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn advance(&mut self) -> Result<Progress, DecodeError> {
        match self.state {
            ParseState::Headers => self.parse_headers(),
            ParseState::Delimiter => self.parse_delimiter(),
            ParseState::Data => self.forward_data(),
            ParseState::Done => Ok(Progress::Continue),
        }
    }

    /// Read the next chunk from the source onto the end of the buffer.
    fn fill(&mut self) -> Result<(), DecodeError> {
        let remaining = self.declared_len.saturating_sub(self.bytes_read);
        if remaining == 0 {
            return Err(self.truncated());
        }

        let want = usize::try_from(remaining)
            .unwrap_or(usize::MAX)
            .min(self.config.read_block_size.max(1));
        self.chunk.resize(want, 0);

        let started = Instant::now();
        let n = loop {
            match self.source.read(&mut self.chunk[..want]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        };
        self.read_time += started.elapsed();

        if n == 0 {
            return Err(self.truncated());
        }
        self.bytes_read += n as u64;
        self.buf.extend_from_slice(&self.chunk[..n]);
        Ok(())
    }

    fn parse_headers(&mut self) -> Result<Progress, DecodeError> {
        let (block_end, consumed) = if self.buf.starts_with(CRLF) {
            (0, CRLF.len())
        } else if let Some(idx) = find(&self.buf, HEADER_TERMINATOR) {
            (idx, idx + HEADER_TERMINATOR.len())
        } else {
            if self.buf.len() > self.config.max_header_size {
                return Err(self.header_too_large());
            }
            return Ok(Progress::NeedMore);
        };

        if block_end > self.config.max_header_size {
            return Err(self.header_too_large());
        }

        let offset = self.offset();
        let kind = PartHeaders::parse(&self.buf[..block_end])
            .and_then(|headers| headers.classify())
            .map_err(|source| DecodeError::MalformedHeader { offset, source })?;

        match kind {
            PartKind::Container { name, boundary } => {
                // The blank line's CRLF doubles as the start of a first
                // delimiter written without a preamble.
                self.consume(consumed - CRLF.len());
                debug!(
                    "container {name} opens at depth {} with boundary {boundary}",
                    self.levels.len() + 1
                );
                let terminator = boundary.data_terminator();
                self.levels.push(Level {
                    boundary,
                    terminator,
                });
                self.containers += 1;
                self.sink.start_container(&name).map_err(DecodeError::Sink)?;
                self.state = ParseState::Delimiter;
            }
            PartKind::File { name, mime_type } => {
                self.consume(consumed);
                if self.levels.is_empty() {
                    return Err(DecodeError::FileOutsideContainer { name });
                }
                debug!("file {name} ({mime_type}) starts");
                self.files += 1;
                self.sink
                    .start_file(&name, &mime_type)
                    .map_err(DecodeError::Sink)?;
                self.scanned = 0;
                self.state = ParseState::Data;
            }
        }
        Ok(Progress::Continue)
    }

    fn parse_delimiter(&mut self) -> Result<Progress, DecodeError> {
        let Some(level) = self.levels.last() else {
            self.state = ParseState::Done;
            return Ok(Progress::Continue);
        };
        let terminator_len = level.terminator.len();
        let len = terminator_len + 2;

        match scan_delimiter(&self.buf, &level.terminator) {
            DelimiterMatch::Absent => {
                // Preamble or epilogue text; only a possible split
                // delimiter at the end needs to be kept.
                let keep = terminator_len + 1;
                let skip = self.buf.len().saturating_sub(keep);
                if skip > 0 {
                    debug!("skipping {skip} bytes outside any part");
                    self.consume(skip);
                }
                Ok(Progress::NeedMore)
            }
            DelimiterMatch::Partial(at) => {
                self.skip_to_delimiter(at);
                Ok(Progress::NeedMore)
            }
            DelimiterMatch::More(at) => {
                debug!("delimiter for {}", level.boundary);
                self.skip_to_delimiter(at);
                self.consume(len);
                self.state = ParseState::Headers;
                Ok(Progress::Continue)
            }
            DelimiterMatch::Last(at) => {
                debug!("final delimiter for {}", level.boundary);
                self.skip_to_delimiter(at);
                self.consume(len);
                self.levels.pop();
                self.sink.end_container().map_err(DecodeError::Sink)?;
                if self.levels.is_empty() {
                    self.state = ParseState::Done;
                }
                Ok(Progress::Continue)
            }
        }
    }

    fn forward_data(&mut self) -> Result<Progress, DecodeError> {
        let Some(level) = self.levels.last() else {
            return Err(DecodeError::UnexpectedBytes {
                offset: self.offset(),
                expected: "a container part",
            });
        };
        let terminator_len = level.terminator.len();
        let from = self.scanned.min(self.buf.len());

        if let Some(pos) = find(&self.buf[from..], &level.terminator) {
            let end = from + pos;
            let consumed = self
                .sink
                .handle_data(&self.buf[..end], false)
                .map_err(DecodeError::Sink)?;
            if consumed > end {
                return Err(DecodeError::SinkOverconsumed {
                    consumed,
                    offered: end,
                });
            }
            if consumed < end {
                return Err(DecodeError::SinkLeftover {
                    unconsumed: end - consumed,
                });
            }
            self.consume(end);
            self.sink.end_file().map_err(DecodeError::Sink)?;
            self.scanned = 0;
            self.state = ParseState::Delimiter;
            return Ok(Progress::Continue);
        }

        // The last few bytes may be the beginning of a terminator split
        // across reads; keep them back until the next read decides.
        let safe = self.buf.len().saturating_sub(terminator_len - 1);
        self.scanned = safe;
        if safe > 0 {
            let consumed = self
                .sink
                .handle_data(&self.buf[..safe], true)
                .map_err(DecodeError::Sink)?;
            if consumed > safe {
                return Err(DecodeError::SinkOverconsumed {
                    consumed,
                    offered: safe,
                });
            }
            self.consume(consumed);
            self.scanned -= consumed;
        }
        Ok(Progress::NeedMore)
    }

    fn consume(&mut self, n: usize) {
        self.buf.drain(..n);
    }

    fn skip_to_delimiter(&mut self, at: usize) {
        if at > 0 {
            debug!("skipping {at} bytes outside any part");
            self.consume(at);
        }
    }

    /// Stream offset of the first buffered byte.
    fn offset(&self) -> u64 {
        self.bytes_read - self.buf.len() as u64
    }

    fn truncated(&self) -> DecodeError {
        DecodeError::TruncatedStream {
            bytes_read: self.bytes_read,
            declared_len: self.declared_len,
        }
    }

    fn header_too_large(&self) -> DecodeError {
        DecodeError::HeaderTooLarge {
            offset: self.offset(),
            limit: self.config.max_header_size,
        }
    }
}

/// Decode a whole stream into its structure, discarding file contents.
///
/// # Errors
///
/// Same as [`StreamDecoder::decode`].
pub fn decode_tree<R: Read>(
    source: R,
    declared_len: u64,
    config: DecoderConfig,
) -> Result<Container, DecodeError> {
    let mut decoder =
        StreamDecoder::new(source, declared_len, TreeBuildingSink::new()).with_config(config);
    let stats = decoder.decode()?;
    decoder
        .into_sink()
        .into_root()
        .ok_or(DecodeError::TruncatedStream {
            bytes_read: stats.bytes_read,
            declared_len,
        })
}

/// Find the first `CRLF--boundary` followed by CRLF or `--`. Occurrences
/// followed by anything else are not delimiters and are skipped.
fn scan_delimiter(buf: &[u8], terminator: &[u8]) -> DelimiterMatch {
    let mut from = 0;
    while let Some(pos) = find(&buf[from..], terminator) {
        let at = from + pos;
        let tail = &buf[at + terminator.len()..];
        match tail.get(..2) {
            Some(b"\r\n") => return DelimiterMatch::More(at),
            Some(b"--") => return DelimiterMatch::Last(at),
            Some(_) => {}
            None if CRLF.starts_with(tail) || b"--".starts_with(tail) => {
                return DelimiterMatch::Partial(at);
            }
            None => {}
        }
        from = at + 1;
    }
    DelimiterMatch::Absent
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        StartContainer(String),
        EndContainer,
        StartFile(String),
        Data(Vec<u8>),
        EndFile,
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    impl ContainerEventSink for Recorder {
        fn start_container(&mut self, name: &str) -> io::Result<()> {
            self.events.push(Event::StartContainer(name.into()));
            Ok(())
        }
        fn end_container(&mut self) -> io::Result<()> {
            self.events.push(Event::EndContainer);
            Ok(())
        }
        fn start_file(&mut self, name: &str, _mime_type: &str) -> io::Result<()> {
            self.events.push(Event::StartFile(name.into()));
            Ok(())
        }
        fn handle_data(&mut self, data: &[u8], _more_expected: bool) -> io::Result<usize> {
            // Merge runs so the event list does not depend on chunking.
            if let Some(Event::Data(prev)) = self.events.last_mut() {
                prev.extend_from_slice(data);
            } else {
                self.events.push(Event::Data(data.to_vec()));
            }
            Ok(data.len())
        }
        fn end_file(&mut self) -> io::Result<()> {
            self.events.push(Event::EndFile);
            Ok(())
        }
    }

    fn sample_stream() -> Vec<u8> {
        let mut s = Vec::new();
        s.extend_from_slice(b"MIME-Version: 1.0\r\nContent-Type: multipart/mixed; container_name=\"job42\"; boundary=\"outerBNDRY\"\r\n\r\n");
        s.extend_from_slice(b"\r\n--outerBNDRY\r\n");
        s.extend_from_slice(b"Content-Type: application/octet-stream\r\nContent-Disposition: attachment; filename=\"a.bin\"\r\n\r\n");
        s.extend_from_slice(b"1234567");
        s.extend_from_slice(b"\r\n--outerBNDRY\r\n");
        s.extend_from_slice(b"MIME-Version: 1.0\r\nContent-Type: multipart/mixed; container_name=\"sub\"; boundary=\"innerBNDRY\"\r\n\r\n");
        s.extend_from_slice(b"\r\n--innerBNDRY\r\n");
        s.extend_from_slice(b"Content-Type: application/octet-stream\r\nContent-Disposition: attachment; filename=\"b.bin\"\r\n\r\n");
        s.extend_from_slice(b"xyz");
        s.extend_from_slice(b"\r\n--innerBNDRY--");
        s.extend_from_slice(b"\r\n--outerBNDRY--");
        s
    }

    fn expected_events() -> Vec<Event> {
        vec![
            Event::StartContainer("job42".into()),
            Event::StartFile("a.bin".into()),
            Event::Data(b"1234567".to_vec()),
            Event::EndFile,
            Event::StartContainer("sub".into()),
            Event::StartFile("b.bin".into()),
            Event::Data(b"xyz".to_vec()),
            Event::EndFile,
            Event::EndContainer,
            Event::EndContainer,
        ]
    }

    fn run(stream: &[u8], block: usize) -> Result<Vec<Event>, DecodeError> {
        let mut decoder = StreamDecoder::new(stream, stream.len() as u64, Recorder::default())
            .with_config(DecoderConfig {
                read_block_size: block,
                ..DecoderConfig::default()
            });
        decoder.decode()?;
        Ok(decoder.into_sink().events)
    }

    #[test]
    fn decodes_nested_sample() {
        assert_eq!(run(&sample_stream(), 4096).unwrap(), expected_events());
    }

    #[test]
    fn any_read_size_gives_the_same_events() {
        let stream = sample_stream();
        for block in 1..=32 {
            assert_eq!(
                run(&stream, block).unwrap(),
                expected_events(),
                "read block size {block}"
            );
        }
    }

    #[test]
    fn never_reads_past_declared_length() {
        let mut stream = sample_stream();
        let declared = stream.len() as u64;
        stream.extend_from_slice(b"trailing bytes belonging to something else");
        let mut cursor = io::Cursor::new(stream);
        let stats = {
            let mut decoder =
                StreamDecoder::new(&mut cursor, declared, ()).with_config(DecoderConfig {
                    read_block_size: 7,
                    ..DecoderConfig::default()
                });
            decoder.decode().unwrap()
        };
        assert_eq!(stats.bytes_read, declared);
        assert_eq!(stats.containers, 2);
        assert_eq!(stats.files, 2);
        assert_eq!(cursor.position(), declared);
    }

    #[test]
    fn empty_container_is_a_bare_event_pair() {
        let stream = b"Content-Type: multipart/mixed; container_name=\"e\"; boundary=\"bb\"\r\n\r\n\r\n--bb--";
        assert_eq!(
            run(stream, 3).unwrap(),
            vec![Event::StartContainer("e".into()), Event::EndContainer]
        );
    }

    #[test]
    fn empty_file_still_gets_a_final_data_call() {
        let stream = b"Content-Type: multipart/mixed; container_name=\"c\"; boundary=\"bb\"\r\n\r\n\r\n--bb\r\nContent-Disposition: attachment; filename=\"z\"\r\n\r\n\r\n--bb--";
        assert_eq!(
            run(stream, 5).unwrap(),
            vec![
                Event::StartContainer("c".into()),
                Event::StartFile("z".into()),
                Event::Data(Vec::new()),
                Event::EndFile,
                Event::EndContainer,
            ]
        );
    }

    #[test]
    fn data_resembling_a_boundary_prefix_is_kept() {
        let stream = b"Content-Type: multipart/mixed; container_name=\"c\"; boundary=\"bb\"\r\n\r\n\r\n--bb\r\nContent-Disposition: attachment; filename=\"f\"\r\n\r\n\r\n--b\r\n-\r\n--bb--";
        let events = run(stream, 2).unwrap();
        assert_eq!(events[2], Event::Data(b"\r\n--b\r\n-".to_vec()));
    }

    #[test]
    fn truncated_mid_file() {
        let stream = sample_stream();
        let cut = &stream[..stream.len() - 40];
        let err = run(cut, 16).unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedStream { .. }), "{err:?}");
    }

    #[test]
    fn truncation_leaves_partial_structure_on_the_tree_sink() {
        let stream = sample_stream();
        let cut = &stream[..stream.len() - 40];
        let mut decoder = StreamDecoder::new(cut, stream.len() as u64, TreeBuildingSink::new());
        assert!(matches!(
            decoder.decode().unwrap_err(),
            DecodeError::TruncatedStream { .. }
        ));

        let sink = decoder.into_sink();
        assert!(sink.root().is_none());
        let open: Vec<_> = sink.open_containers().iter().map(Container::name).collect();
        assert_eq!(open, ["job42", "sub"]);
        assert_eq!(
            sink.open_containers()[0].outline(),
            "job42/\n  a.bin (application/octet-stream, 7 bytes)"
        );
        assert!(sink.open_containers()[1].files().is_empty());
    }

    #[test]
    fn truncated_before_final_delimiter() {
        let stream = sample_stream();
        let cut = &stream[..stream.len() - b"\r\n--outerBNDRY--".len()];
        let err = run(cut, 16).unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedStream { .. }));
    }

    #[test]
    fn declared_length_too_short() {
        let stream = sample_stream();
        let mut decoder = StreamDecoder::new(&stream[..], 100, ());
        let err = decoder.decode().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TruncatedStream {
                bytes_read: 100,
                declared_len: 100
            }
        ));
    }

    #[test]
    fn part_without_filename() {
        let stream = b"Content-Type: multipart/mixed; container_name=\"c\"; boundary=\"bb\"\r\n\r\n\r\n--bb\r\nContent-Type: text/plain\r\n\r\nxx\r\n--bb--";
        let err = run(stream, 64).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedHeader { offset: 76, .. }), "{err:?}");
    }

    #[test]
    fn file_at_top_level() {
        let stream = b"Content-Disposition: attachment; filename=\"f\"\r\n\r\ndata";
        let err = run(stream, 64).unwrap_err();
        assert!(matches!(err, DecodeError::FileOutsideContainer { name } if name == "f"));
    }

    #[test]
    fn text_before_a_delimiter_is_skipped() {
        let stream = b"Content-Type: multipart/mixed; container_name=\"c\"; boundary=\"bb\"\r\n\r\nnoise\r\n--bb--";
        for block in [1, 4, 64] {
            assert_eq!(
                run(stream, block).unwrap(),
                vec![Event::StartContainer("c".into()), Event::EndContainer]
            );
        }
    }

    #[test]
    fn preamble_and_epilogue_are_ignored() {
        let stream = b"MIME-Version: 1.0\r\nContent-Type: multipart/mixed; container_name=\"c\"; boundary=\"bb\"\r\n\r\nThis is a multi-part message in MIME format.\r\n--bb\r\nContent-Disposition: attachment; filename=\"f\"\r\n\r\nhello\r\n--bb--\r\nepilogue";
        let expected = vec![
            Event::StartContainer("c".into()),
            Event::StartFile("f".into()),
            Event::Data(b"hello".to_vec()),
            Event::EndFile,
            Event::EndContainer,
        ];
        for block in [1, 3, 7, 4096] {
            assert_eq!(run(stream, block).unwrap(), expected, "read block size {block}");
        }

        let root = decode_tree(&stream[..], stream.len() as u64, DecoderConfig::default()).unwrap();
        assert_eq!(root.outline(), "c/\n  f (application/octet-stream, 5 bytes)");
    }

    #[test]
    fn first_delimiter_right_after_headers() {
        let stream = b"Content-Type: multipart/mixed; container_name=\"c\"; boundary=\"bb\"\r\n\r\n--bb\r\nContent-Disposition: attachment; filename=\"f\"\r\n\r\nxy\r\n--bb--";
        let events = run(stream, 2).unwrap();
        assert_eq!(events[1], Event::StartFile("f".into()));
        assert_eq!(events[2], Event::Data(b"xy".to_vec()));
    }

    #[test]
    fn boundary_lookalikes_outside_parts_are_not_delimiters() {
        let stream = b"Content-Type: multipart/mixed; container_name=\"c\"; boundary=\"bb\"\r\n\r\n\r\n--bbX\r\n--bb--";
        assert_eq!(
            run(stream, 64).unwrap(),
            vec![Event::StartContainer("c".into()), Event::EndContainer]
        );
    }

    #[test]
    fn long_preamble_keeps_the_buffer_small() {
        let mut stream = b"Content-Type: multipart/mixed; container_name=\"c\"; boundary=\"bb\"\r\n\r\n".to_vec();
        stream.extend(std::iter::repeat_n(b'p', 100_000));
        stream.extend_from_slice(b"\r\n--bb--");
        let mut decoder = StreamDecoder::new(&stream[..], stream.len() as u64, Recorder::default())
            .with_config(DecoderConfig {
                read_block_size: 512,
                ..DecoderConfig::default()
            });
        decoder.decode().unwrap();
        assert!(decoder.buf.capacity() < 4096, "{}", decoder.buf.capacity());
    }

    #[test]
    fn missing_delimiter_is_truncation() {
        let stream = b"Content-Type: multipart/mixed; container_name=\"c\"; boundary=\"bb\"\r\n\r\nno delimiter here";
        let err = run(stream, 8).unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedStream { .. }), "{err:?}");
    }

    #[test]
    fn oversized_header_block() {
        let mut stream = b"Content-Type: multipart/mixed; container_name=\"".to_vec();
        stream.extend(std::iter::repeat_n(b'n', 200));
        let mut decoder = StreamDecoder::new(&stream[..], stream.len() as u64, ()).with_config(
            DecoderConfig {
                read_block_size: 16,
                max_header_size: 64,
            },
        );
        assert!(matches!(
            decoder.decode().unwrap_err(),
            DecodeError::HeaderTooLarge { limit: 64, .. }
        ));
    }

    /// Refuses everything until told the file is complete.
    #[derive(Default)]
    struct Stubborn {
        files: Vec<Vec<u8>>,
        offers: usize,
    }

    impl ContainerEventSink for Stubborn {
        fn start_file(&mut self, _name: &str, _mime_type: &str) -> io::Result<()> {
            self.files.push(Vec::new());
            Ok(())
        }
        fn handle_data(&mut self, data: &[u8], more_expected: bool) -> io::Result<usize> {
            self.offers += 1;
            if more_expected {
                return Ok(0);
            }
            self.files.last_mut().unwrap().extend_from_slice(data);
            Ok(data.len())
        }
    }

    #[test]
    fn leftovers_are_offered_again() {
        let stream = sample_stream();
        let mut decoder = StreamDecoder::new(&stream[..], stream.len() as u64, Stubborn::default())
            .with_config(DecoderConfig {
                read_block_size: 3,
                ..DecoderConfig::default()
            });
        decoder.decode().unwrap();
        let sink = decoder.into_sink();
        assert_eq!(sink.files, vec![b"1234567".to_vec(), b"xyz".to_vec()]);
        assert!(sink.offers > 2);
    }

    struct Hoarder;

    impl ContainerEventSink for Hoarder {
        fn handle_data(&mut self, data: &[u8], _more_expected: bool) -> io::Result<usize> {
            Ok(data.len().saturating_sub(1))
        }
    }

    #[test]
    fn leftover_on_last_call_is_a_violation() {
        let stream = sample_stream();
        let mut decoder = StreamDecoder::new(&stream[..], stream.len() as u64, Hoarder);
        assert!(matches!(
            decoder.decode().unwrap_err(),
            DecodeError::SinkLeftover { unconsumed: 1 }
        ));
    }

    #[test]
    fn sink_errors_abort() {
        struct Failing;
        impl ContainerEventSink for Failing {
            fn start_file(&mut self, _name: &str, _mime_type: &str) -> io::Result<()> {
                Err(io::Error::other("disk full"))
            }
        }
        let stream = sample_stream();
        let mut decoder = StreamDecoder::new(&stream[..], stream.len() as u64, Failing);
        assert!(matches!(decoder.decode().unwrap_err(), DecodeError::Sink(_)));
    }

    #[test]
    fn decode_tree_returns_structure() {
        let stream = sample_stream();
        let root = decode_tree(&stream[..], stream.len() as u64, DecoderConfig::default()).unwrap();
        assert_eq!(
            root.outline(),
            "job42/\n  sub/\n    b.bin (application/octet-stream, 3 bytes)\n  a.bin (application/octet-stream, 7 bytes)"
        );
    }
}
