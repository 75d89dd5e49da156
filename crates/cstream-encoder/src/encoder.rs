use std::io::{self, Read, Write};
use std::mem;

use cstream_types::{Container, FileEntry};
use cstream_wire::template::{CONTAINER_HEADERS, DELIMITER, FILE_HEADERS, FINAL_DELIMITER};
use cstream_wire::{Boundary, CONTAINER_MEDIA_TYPE, Fields, Template};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::EncoderConfig;
use crate::error::EncodeError;
use crate::size::compute_total_size;

/// One open container level.
struct Frame<'a> {
    container: &'a Container,
    boundary: Boundary,
    next_container: usize,
    next_file: usize,
    file: Option<OpenFile<'a>>,
}

struct OpenFile<'a> {
    entry: &'a FileEntry,
    written: u64,
}

/// Streams a [`Container`] tree onto a byte sink.
///
/// The total size is known from [`new`](Self::new) onwards and the encoder
/// refuses to finish if the bytes it wrote differ from it. There are two
/// ways to drive it:
///
/// - **Push**: call [`start_container`](Self::start_container),
///   [`start_next_file`](Self::start_next_file),
///   [`write_data`](Self::write_data) and
///   [`end_container`](Self::end_container) yourself, in tree order. Each
///   level keeps a cursor into its child containers and its files, so the
///   encoder always knows which child comes next.
/// - **Pull**: [`encode_all`](Self::encode_all) walks the tree itself
///   (nested containers first, then files) and reads each file from its
///   [`DataSource`](cstream_types::DataSource).
///
/// ```text
///   start_container()           root headers
///     start_container()         ⏎--B1⏎ + sub headers
///       start_next_file()       ⏎--B2⏎ + b.bin headers
///       write_data(b"xyz")
///     end_container()           ⏎--B2--
///     start_next_file()         ⏎--B1⏎ + a.bin headers
///     write_data(b"1234567")
///   end_container()             ⏎--B1--
/// ```
pub struct StreamEncoder<'a, W> {
    root: &'a Container,
    out: W,
    config: EncoderConfig,
    rng: StdRng,
    total_size: u64,
    written: u64,
    started: bool,
    frames: Vec<Frame<'a>>,
    /// Reader of the file being copied by `step`.
    source: Option<Box<dyn Read + Send + 'a>>,
    chunk: Vec<u8>,
}

impl<'a, W: Write> StreamEncoder<'a, W> {
    /// Prepare to encode `root` into `out`.
    ///
    /// # Errors
    ///
    /// [`EncodeError::InvalidName`] or [`EncodeError::InvalidMimeType`] if
    /// any name or mime type in the tree cannot be framed.
    pub fn new(root: &'a Container, out: W) -> Result<Self, EncodeError> {
        root.validate()?;
        validate_mime_types(root)?;

        Ok(Self {
            root,
            out,
            config: EncoderConfig::default(),
            rng: StdRng::from_os_rng(),
            total_size: compute_total_size(root),
            written: 0,
            started: false,
            frames: Vec::new(),
            source: None,
            chunk: Vec::new(),
        })
    }

    /// Use a deterministic boundary generator.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EncoderConfig) -> Self {
        self.config = config;
        self
    }

    /// The exact number of bytes this encoder will emit.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Bytes emitted so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Whether the root container has been closed.
    pub fn is_finished(&self) -> bool {
        self.started && self.frames.is_empty()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Open the next container: the root on the first call, afterwards the
    /// next not yet emitted child container of the current level.
    ///
    /// # Errors
    ///
    /// [`EncodeError::ProtocolViolation`] if the root is already closed or
    /// the current level has no child container left.
    pub fn start_container(&mut self) -> Result<(), EncodeError> {
        let container = if self.started {
            let Some(parent) = self.frames.last_mut() else {
                return Err(EncodeError::protocol("the root container is already closed"));
            };
            close_file(parent)?;
            let level: &'a Container = parent.container;
            let Some(child) = level.containers().get(parent.next_container) else {
                return Err(EncodeError::protocol(format!(
                    "container {} has no further nested container",
                    level.name()
                )));
            };
            parent.next_container += 1;
            let delimiter = Fields::boundary(&parent.boundary);
            self.written += DELIMITER.render(&delimiter, &mut self.out)?;
            child
        } else {
            self.started = true;
            self.root
        };

        let boundary = self.fresh_boundary();
        self.emit(&CONTAINER_HEADERS, &Fields::container(container.name(), &boundary))?;
        debug!(
            "container {} opened at depth {} with boundary {boundary}",
            container.name(),
            self.frames.len() + 1
        );
        self.frames.push(Frame {
            container,
            boundary,
            next_container: 0,
            next_file: 0,
            file: None,
        });
        Ok(())
    }

    /// Emit the delimiter and headers of the current level's next file and
    /// return it. Its data follows through [`write_data`](Self::write_data).
    ///
    /// # Errors
    ///
    /// [`EncodeError::ProtocolViolation`] if no container is open or all of
    /// its files were started; [`EncodeError::FileSizeMismatch`] if the
    /// previous file did not receive its declared size.
    pub fn start_next_file(&mut self) -> Result<&'a FileEntry, EncodeError> {
        let frame = top(&mut self.frames)?;
        close_file(frame)?;
        let level: &'a Container = frame.container;
        let Some(entry) = level.files().get(frame.next_file) else {
            return Err(EncodeError::protocol(format!(
                "all files of container {} were already started",
                level.name()
            )));
        };
        frame.next_file += 1;
        frame.file = Some(OpenFile { entry, written: 0 });

        let delimiter = Fields::boundary(&frame.boundary);
        self.written += DELIMITER.render(&delimiter, &mut self.out)?;
        self.emit(&FILE_HEADERS, &Fields::file(entry.name(), entry.mime_type()))?;
        debug!("file {} ({} bytes) started", entry.name(), entry.size());
        Ok(entry)
    }

    /// Append bytes to the file opened by the last
    /// [`start_next_file`](Self::start_next_file).
    ///
    /// # Errors
    ///
    /// [`EncodeError::ProtocolViolation`] if no file is open or the data
    /// would exceed the file's declared size.
    pub fn write_data(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        let frame = top(&mut self.frames)?;
        let Some(file) = frame.file.as_mut() else {
            return Err(EncodeError::protocol("write_data without an open file"));
        };
        let after = file.written + data.len() as u64;
        if after > file.entry.size() {
            return Err(EncodeError::protocol(format!(
                "{} bytes written to {}, which declares {}",
                after,
                file.entry.name(),
                file.entry.size()
            )));
        }
        file.written = after;
        self.out.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Emit the current level's final delimiter and return to the parent.
    ///
    /// # Errors
    ///
    /// [`EncodeError::ProtocolViolation`] if no container is open or some of
    /// its children were never emitted.
    pub fn end_container(&mut self) -> Result<(), EncodeError> {
        let frame = top(&mut self.frames)?;
        close_file(frame)?;
        let pending_containers = frame.container.containers().len() - frame.next_container;
        let pending_files = frame.container.files().len() - frame.next_file;
        if pending_containers + pending_files > 0 {
            return Err(EncodeError::protocol(format!(
                "container {} closed with {pending_containers} nested containers and {pending_files} files not emitted",
                frame.container.name()
            )));
        }

        if let Some(frame) = self.frames.pop() {
            self.emit(&FINAL_DELIMITER, &Fields::boundary(&frame.boundary))?;
            debug!(
                "container {} closed, boundary {} released",
                frame.container.name(),
                frame.boundary
            );
        }
        Ok(())
    }

    /// Check the stream is complete, flush, and hand back the sink together
    /// with the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`EncodeError::ProtocolViolation`] if the root was never closed,
    /// [`EncodeError::SizeMismatch`] if the byte count is off.
    pub fn finish(mut self) -> Result<(W, u64), EncodeError> {
        if !self.is_finished() {
            return Err(EncodeError::protocol("finish called before the root container was closed"));
        }
        if self.written != self.total_size {
            return Err(EncodeError::SizeMismatch {
                expected: self.total_size,
                actual: self.written,
            });
        }
        self.out.flush()?;
        info!("encoded {} bytes", self.written);
        Ok((self.out, self.written))
    }

    /// Encode the whole tree, reading file data from the entries' sources,
    /// then [`finish`](Self::finish).
    ///
    /// # Errors
    ///
    /// Any [`EncodeError`]; [`EncodeError::FileSizeMismatch`] when a source
    /// does not yield exactly the declared number of bytes.
    pub fn encode_all(mut self) -> Result<(W, u64), EncodeError> {
        while self.step()? {}
        self.finish()
    }

    /// Perform the next action of a full tree walk. Returns `false` once the
    /// root container has been closed.
    pub(crate) fn step(&mut self) -> Result<bool, EncodeError> {
        if !self.started {
            self.start_container()?;
            return Ok(true);
        }
        let Some(frame) = self.frames.last() else {
            return Ok(false);
        };

        if frame.file.is_some() {
            self.pump_file()?;
        } else if frame.next_container < frame.container.containers().len() {
            self.start_container()?;
        } else if frame.next_file < frame.container.files().len() {
            let entry = self.start_next_file()?;
            self.source = Some(entry.source().open()?);
        } else {
            self.end_container()?;
        }
        Ok(true)
    }

    /// Copy one block of the open file from its source, closing the file
    /// once its declared size has been reached.
    fn pump_file(&mut self) -> Result<(), EncodeError> {
        let (entry, written) = match self.frames.last().and_then(|f| f.file.as_ref()) {
            Some(file) => (file.entry, file.written),
            None => return Ok(()),
        };
        let Some(source) = self.source.as_mut() else {
            return Err(EncodeError::protocol("file data requested without a source"));
        };

        let remaining = entry.size() - written;
        if remaining == 0 {
            let mut probe = [0u8; 1];
            if read_retrying(source, &mut probe)? != 0 {
                let extra = io::copy(source, &mut io::sink())?;
                return Err(EncodeError::FileSizeMismatch {
                    file: entry.name().to_string(),
                    declared: entry.size(),
                    actual: entry.size() + 1 + extra,
                });
            }
            self.source = None;
            if let Some(frame) = self.frames.last_mut() {
                frame.file = None;
            }
            return Ok(());
        }

        let want = usize::try_from(remaining)
            .unwrap_or(usize::MAX)
            .min(self.config.read_block_size.max(1));
        let mut chunk = mem::take(&mut self.chunk);
        chunk.resize(want, 0);
        let n = read_retrying(source, &mut chunk[..want])?;
        if n == 0 {
            return Err(EncodeError::FileSizeMismatch {
                file: entry.name().to_string(),
                declared: entry.size(),
                actual: written,
            });
        }
        let result = self.write_data(&chunk[..n]);
        self.chunk = chunk;
        result
    }

    fn emit(&mut self, template: &Template, fields: &Fields<'_>) -> Result<(), EncodeError> {
        self.written += template.render(fields, &mut self.out)?;
        Ok(())
    }

    /// A boundary that differs from every boundary still open, so that no
    /// level can mistake an ancestor's delimiter for its own.
    fn fresh_boundary(&mut self) -> Boundary {
        loop {
            let candidate = Boundary::generate(&mut self.rng);
            if self.frames.iter().all(|f| f.boundary != candidate) {
                return candidate;
            }
        }
    }
}

fn top<'f, 'a>(frames: &'f mut [Frame<'a>]) -> Result<&'f mut Frame<'a>, EncodeError> {
    frames
        .last_mut()
        .ok_or_else(|| EncodeError::protocol("no container is open"))
}

/// Verify the open file (if any) got all its bytes, then forget it.
fn close_file(frame: &mut Frame<'_>) -> Result<(), EncodeError> {
    if let Some(file) = frame.file.take() {
        if file.written != file.entry.size() {
            return Err(EncodeError::FileSizeMismatch {
                file: file.entry.name().to_string(),
                declared: file.entry.size(),
                actual: file.written,
            });
        }
    }
    Ok(())
}

fn validate_mime_types(container: &Container) -> Result<(), EncodeError> {
    for file in container.files() {
        let mime = file.mime_type();
        let unusable = mime.is_empty()
            || mime.trim() != mime
            || mime.bytes().any(|b| matches!(b, b'\r' | b'\n' | b'\0'))
            || mime
                .get(..CONTAINER_MEDIA_TYPE.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(CONTAINER_MEDIA_TYPE));
        if unusable {
            return Err(EncodeError::InvalidMimeType {
                file: file.name().to_string(),
                mime_type: mime.to_string(),
            });
        }
    }
    container.containers().iter().try_for_each(validate_mime_types)
}

fn read_retrying<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match source.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cstream_decoder::{DecoderConfig, decode_tree};

    use super::*;

    const OCTET: &str = "application/octet-stream";

    fn sample() -> Container {
        Container::new("job42")
            .with_file(FileEntry::from_bytes("a.bin", OCTET, &b"1234567"[..]))
            .with_container(
                Container::new("sub").with_file(FileEntry::from_bytes("b.bin", OCTET, &b"xyz"[..])),
            )
    }

    #[test]
    fn encode_all_matches_prediction_and_decodes() {
        let root = sample();
        let encoder = StreamEncoder::new(&root, Vec::new()).unwrap().with_seed(1);
        assert_eq!(encoder.total_size(), 472);
        let (bytes, n) = encoder.encode_all().unwrap();
        assert_eq!(n, 472);
        assert_eq!(bytes.len(), 472);

        let decoded = decode_tree(&bytes[..], n, DecoderConfig::default()).unwrap();
        assert!(decoded.same_structure(&root));
    }

    #[test]
    fn seeded_encoders_are_reproducible() {
        let root = sample();
        let a = StreamEncoder::new(&root, Vec::new()).unwrap().with_seed(9).encode_all().unwrap();
        let b = StreamEncoder::new(&root, Vec::new()).unwrap().with_seed(9).encode_all().unwrap();
        let c = StreamEncoder::new(&root, Vec::new()).unwrap().with_seed(10).encode_all().unwrap();
        assert_eq!(a.0, b.0);
        assert_ne!(a.0, c.0);
    }

    #[test]
    fn push_api_in_any_child_order() {
        let root = sample();
        let mut enc = StreamEncoder::new(&root, Vec::new()).unwrap();
        enc.start_container().unwrap();
        let first = enc.start_next_file().unwrap();
        assert_eq!(first.name(), "a.bin");
        enc.write_data(b"123").unwrap();
        enc.write_data(b"4567").unwrap();
        enc.start_container().unwrap();
        enc.start_next_file().unwrap();
        enc.write_data(b"xyz").unwrap();
        enc.end_container().unwrap();
        enc.end_container().unwrap();
        let (bytes, n) = enc.finish().unwrap();
        assert_eq!(n, 472);
        let decoded = decode_tree(&bytes[..], n, DecoderConfig::default()).unwrap();
        assert!(decoded.same_structure(&root));
    }

    #[test]
    fn too_many_files_is_a_protocol_violation() {
        let root = Container::new("c");
        let mut enc = StreamEncoder::new(&root, io::sink()).unwrap();
        enc.start_container().unwrap();
        assert!(matches!(
            enc.start_next_file().unwrap_err(),
            EncodeError::ProtocolViolation(_)
        ));
    }

    #[test]
    fn writing_past_declared_size() {
        let root = Container::new("c").with_file(FileEntry::placeholder("f", OCTET, 2));
        let mut enc = StreamEncoder::new(&root, io::sink()).unwrap();
        enc.start_container().unwrap();
        enc.start_next_file().unwrap();
        assert!(matches!(
            enc.write_data(b"abc").unwrap_err(),
            EncodeError::ProtocolViolation(_)
        ));
    }

    #[test]
    fn closing_with_pending_children() {
        let root = sample();
        let mut enc = StreamEncoder::new(&root, io::sink()).unwrap();
        enc.start_container().unwrap();
        assert!(matches!(
            enc.end_container().unwrap_err(),
            EncodeError::ProtocolViolation(_)
        ));
    }

    #[test]
    fn nothing_after_the_root_closes() {
        let root = Container::new("c");
        let mut enc = StreamEncoder::new(&root, Vec::new()).unwrap();
        enc.start_container().unwrap();
        enc.end_container().unwrap();
        assert!(enc.is_finished());
        assert!(matches!(
            enc.start_container().unwrap_err(),
            EncodeError::ProtocolViolation(_)
        ));
        assert!(matches!(
            enc.write_data(b"x").unwrap_err(),
            EncodeError::ProtocolViolation(_)
        ));
    }

    #[test]
    fn unfinished_stream_cannot_finish() {
        let root = Container::new("c");
        let mut enc = StreamEncoder::new(&root, Vec::new()).unwrap();
        enc.start_container().unwrap();
        assert!(matches!(enc.finish().unwrap_err(), EncodeError::ProtocolViolation(_)));
    }

    #[test]
    fn short_file_is_a_size_mismatch() {
        let root = Container::new("c").with_file(FileEntry::placeholder("f", OCTET, 5));
        let err = StreamEncoder::new(&root, io::sink()).unwrap().encode_all().unwrap_err();
        assert!(matches!(
            err,
            EncodeError::FileSizeMismatch { declared: 5, actual: 0, .. }
        ));
    }

    #[test]
    fn long_file_is_a_size_mismatch() {
        let opener: cstream_types::source::Opener =
            Arc::new(|| -> io::Result<Box<dyn Read + Send>> {
                Ok(Box::new(io::Cursor::new(vec![7u8; 10])))
            });
        let root = Container::new("c").with_file(FileEntry::from_opener("f", OCTET, 4, opener));
        let err = StreamEncoder::new(&root, io::sink())
            .unwrap()
            .with_config(EncoderConfig { read_block_size: 3 })
            .encode_all()
            .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::FileSizeMismatch { declared: 4, actual: 10, .. }
        ));
    }

    #[test]
    fn push_api_detects_short_writes() {
        let root = Container::new("c")
            .with_file(FileEntry::placeholder("f", OCTET, 4))
            .with_file(FileEntry::placeholder("g", OCTET, 0));
        let mut enc = StreamEncoder::new(&root, io::sink()).unwrap();
        enc.start_container().unwrap();
        enc.start_next_file().unwrap();
        enc.write_data(b"ab").unwrap();
        assert!(matches!(
            enc.start_next_file().unwrap_err(),
            EncodeError::FileSizeMismatch { declared: 4, actual: 2, .. }
        ));
    }

    #[test]
    fn rejects_names_that_break_framing() {
        let root = Container::new("bad\"name");
        assert!(matches!(
            StreamEncoder::new(&root, io::sink()),
            Err(EncodeError::InvalidName(_))
        ));
    }

    #[test]
    fn rejects_multipart_mime_for_files() {
        let root = Container::new("c").with_file(FileEntry::placeholder("f", "Multipart/Mixed", 0));
        assert!(matches!(
            StreamEncoder::new(&root, io::sink()),
            Err(EncodeError::InvalidMimeType { .. })
        ));
    }

    #[test]
    fn nested_boundaries_are_distinct() {
        let mut root = Container::new("l0");
        let mut deepest = Container::new("l5");
        deepest.add_file(FileEntry::from_bytes("f", OCTET, vec![0u8; 4]));
        for level in (1..5).rev() {
            deepest = Container::new(format!("l{level}")).with_container(deepest);
        }
        root.add_container(deepest);

        let mut enc = StreamEncoder::new(&root, Vec::new()).unwrap().with_seed(3);
        for _ in 0..6 {
            enc.start_container().unwrap();
        }
        let boundaries: std::collections::HashSet<_> =
            enc.frames.iter().map(|f| f.boundary.clone()).collect();
        assert_eq!(boundaries.len(), 6);
    }
}
