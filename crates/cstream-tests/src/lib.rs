//! Shared fixtures for the integration tests and benches.

#![allow(clippy::pedantic)]

use std::io::{self, Read};
use std::path::Path;

use cstream_decoder::ContainerEventSink;
use cstream_encoder::StreamEncoder;
use cstream_types::{Container, FileEntry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const OCTET: &str = "application/octet-stream";

/// `job42/{a.bin (7 bytes), sub/{b.bin (3 bytes)}}`.
pub fn job42() -> Container {
    Container::new("job42")
        .with_file(FileEntry::from_bytes("a.bin", OCTET, &b"1234567"[..]))
        .with_container(
            Container::new("sub").with_file(FileEntry::from_bytes("b.bin", OCTET, &b"xyz"[..])),
        )
}

/// A pseudo-random tree up to four levels deep. File sizes range from
/// empty to a few blocks of the default read size, and file data is
/// sprinkled with `CRLF--` so it looks like the start of a delimiter.
pub fn varied_tree(seed: u64) -> Container {
    let mut rng = StdRng::seed_from_u64(seed);
    build(&mut rng, "root".to_string(), 0)
}

fn build(rng: &mut StdRng, name: String, depth: usize) -> Container {
    let mut container = Container::new(name);
    let nested = if depth < 3 { rng.random_range(0..=2) } else { 0 };
    for i in 0..nested {
        container.add_container(build(rng, format!("d{depth}_{i}"), depth + 1));
    }
    for i in 0..rng.random_range(0..=3) {
        let size = match rng.random_range(0..4) {
            0 => 0,
            1 => rng.random_range(1..64),
            2 => rng.random_range(64..4096),
            _ => rng.random_range(60_000..140_000),
        };
        let mime = if i % 2 == 0 { OCTET } else { "text/plain; charset=utf-8" };
        container.add_file(FileEntry::from_bytes(
            format!("f{depth}_{i}.bin"),
            mime,
            payload(rng, size),
        ));
    }
    container
}

/// Random bytes with `\r\n--` every 97 bytes.
pub fn payload(rng: &mut StdRng, size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    rng.fill(&mut data[..]);
    for pos in (0..size).step_by(97) {
        let end = (pos + 4).min(size);
        data[pos..end].copy_from_slice(&b"\r\n--"[..end - pos]);
    }
    data
}

/// Encode with a fixed seed.
pub fn encode(root: &Container, seed: u64) -> Vec<u8> {
    StreamEncoder::new(root, Vec::new())
        .expect("valid tree")
        .with_seed(seed)
        .encode_all()
        .expect("encode")
        .0
}

/// `(path, contents)` of every file, in the order the encoder emits them.
pub fn expected_files(root: &Container) -> Vec<(String, Vec<u8>)> {
    let mut out = Vec::new();
    collect(root, "", &mut out);
    out
}

fn collect(container: &Container, parent: &str, out: &mut Vec<(String, Vec<u8>)>) {
    let dir = if parent.is_empty() {
        container.name().to_string()
    } else {
        format!("{parent}/{}", container.name())
    };
    for child in container.containers() {
        collect(child, &dir, out);
    }
    for file in container.files() {
        let mut data = Vec::new();
        file.source()
            .open()
            .and_then(|mut r| r.read_to_end(&mut data))
            .expect("fixture data");
        out.push((format!("{dir}/{}", file.name()), data));
    }
}

/// Materialise a tree below `base`.
pub fn write_tree(base: &Path, root: &Container) -> io::Result<()> {
    let dir = base.join(root.name());
    std::fs::create_dir_all(&dir)?;
    for child in root.containers() {
        write_tree(&dir, child)?;
    }
    for file in root.files() {
        let mut out = std::fs::File::create(dir.join(file.name()))?;
        io::copy(&mut file.source().open()?, &mut out)?;
    }
    Ok(())
}

/// Collects every file's bytes under its slash-separated path.
#[derive(Debug, Default)]
pub struct CollectingSink {
    dirs: Vec<String>,
    pub files: Vec<(String, Vec<u8>)>,
    pub data_calls: usize,
}

impl ContainerEventSink for CollectingSink {
    fn start_container(&mut self, name: &str) -> io::Result<()> {
        self.dirs.push(name.to_string());
        Ok(())
    }

    fn end_container(&mut self) -> io::Result<()> {
        self.dirs.pop();
        Ok(())
    }

    fn start_file(&mut self, name: &str, _mime_type: &str) -> io::Result<()> {
        self.files
            .push((format!("{}/{name}", self.dirs.join("/")), Vec::new()));
        Ok(())
    }

    fn handle_data(&mut self, data: &[u8], _more_expected: bool) -> io::Result<usize> {
        self.data_calls += 1;
        match self.files.last_mut() {
            Some((_, contents)) => contents.extend_from_slice(data),
            None => return Err(io::Error::other("data before any file")),
        }
        Ok(data.len())
    }
}

/// Leaves every byte unconsumed until the decoder says the file is
/// complete.
#[derive(Debug, Default)]
pub struct StubbornSink {
    pub inner: CollectingSink,
    pub deferred: usize,
}

impl ContainerEventSink for StubbornSink {
    fn start_container(&mut self, name: &str) -> io::Result<()> {
        self.inner.start_container(name)
    }

    fn end_container(&mut self) -> io::Result<()> {
        self.inner.end_container()
    }

    fn start_file(&mut self, name: &str, mime_type: &str) -> io::Result<()> {
        self.inner.start_file(name, mime_type)
    }

    fn handle_data(&mut self, data: &[u8], more_expected: bool) -> io::Result<usize> {
        if more_expected {
            self.deferred += 1;
            return Ok(0);
        }
        self.inner.handle_data(data, more_expected)
    }
}

/// A reader returning between 1 and `max` bytes per call.
pub struct Dribble<R> {
    inner: R,
    rng: StdRng,
    max: usize,
}

impl<R> Dribble<R> {
    pub fn new(inner: R, max: usize, seed: u64) -> Self {
        Self {
            inner,
            rng: StdRng::seed_from_u64(seed),
            max: max.max(1),
        }
    }
}

impl<R: Read> Read for Dribble<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.rng.random_range(1..=self.max).min(buf.len());
        self.inner.read(&mut buf[..n])
    }
}
