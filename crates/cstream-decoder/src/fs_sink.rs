use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use cstream_types::Container;
use cstream_types::name::is_safe_path_component;
use log::debug;

use crate::checksum::RollingChecksum;
use crate::config::FilesystemSinkConfig;
use crate::sink::ContainerEventSink;
use crate::tree_sink::TreeBuildingSink;

/// One file written by a [`FilesystemSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenFile {
    /// Slash-separated path of the container the file belongs to.
    pub container: String,
    /// Where the bytes were written.
    pub path: PathBuf,
    pub size: u64,
    /// Final value of the rolling checksum, if one was configured.
    pub checksum: Option<String>,
}

struct OpenFile {
    out: File,
    path: PathBuf,
    written: u64,
    checksum: Option<Box<dyn RollingChecksum>>,
}

/// Writes the decoded tree below a base directory: one directory per
/// container, one file per file part.
///
/// The structure is also recorded as with [`TreeBuildingSink`]. Names come
/// from the peer and are refused unless they are a single, plain path
/// component. Files and directories created before a failure are left in
/// place.
pub struct FilesystemSink {
    tree: TreeBuildingSink,
    config: FilesystemSinkConfig,
    base: PathBuf,
    dirs: Vec<String>,
    file: Option<OpenFile>,
    written: Vec<WrittenFile>,
    write_time: Duration,
    checksum_time: Duration,
}

impl FilesystemSink {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self::with_config(base, FilesystemSinkConfig::default())
    }

    pub fn with_config(base: impl Into<PathBuf>, config: FilesystemSinkConfig) -> Self {
        Self {
            tree: TreeBuildingSink::new(),
            config,
            base: base.into(),
            dirs: Vec::new(),
            file: None,
            written: Vec::new(),
            write_time: Duration::ZERO,
            checksum_time: Duration::ZERO,
        }
    }

    /// Directory of the root container, once its name is known.
    pub fn root_dir(&self) -> Option<PathBuf> {
        let name = match self.dirs.first() {
            Some(name) => name.as_str(),
            None => self.tree.root()?.name(),
        };
        Some(self.base.join(name))
    }

    /// Files written so far, in the order they were closed.
    pub fn written_files(&self) -> &[WrittenFile] {
        &self.written
    }

    /// The decoded structure, once the root container has closed.
    pub fn root(&self) -> Option<&Container> {
        self.tree.root()
    }

    pub fn into_parts(self) -> (Option<Container>, Vec<WrittenFile>) {
        (self.tree.into_root(), self.written)
    }

    /// Time spent inside `write` calls.
    pub fn write_time(&self) -> Duration {
        self.write_time
    }

    /// Time spent updating checksums.
    pub fn checksum_time(&self) -> Duration {
        self.checksum_time
    }

    fn current_dir(&self) -> PathBuf {
        let mut dir = self.base.clone();
        dir.extend(&self.dirs);
        dir
    }

    fn timed_write(&mut self, block: &[u8]) -> io::Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("data received outside of a file"))?;

        let started = Instant::now();
        file.out.write_all(block)?;
        self.write_time += started.elapsed();
        file.written += block.len() as u64;

        if let Some(checksum) = file.checksum.as_mut() {
            let started = Instant::now();
            checksum.update(block);
            self.checksum_time += started.elapsed();
        }
        Ok(())
    }
}

fn checked_component(name: &str) -> io::Result<&str> {
    if is_safe_path_component(name) {
        Ok(name)
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to unpack entry named {name:?}"),
        ))
    }
}

impl ContainerEventSink for FilesystemSink {
    fn start_container(&mut self, name: &str) -> io::Result<()> {
        let name = checked_component(name)?;
        self.tree.start_container(name)?;
        self.dirs.push(name.to_string());
        let dir = self.current_dir();
        debug!("receiving container {name} into {}", dir.display());
        fs::create_dir_all(&dir)
    }

    fn end_container(&mut self) -> io::Result<()> {
        self.tree.end_container()?;
        self.dirs.pop();
        debug!("finished receiving container");
        Ok(())
    }

    fn start_file(&mut self, name: &str, mime_type: &str) -> io::Result<()> {
        let name = checked_component(name)?;
        self.tree.start_file(name, mime_type)?;
        let path = self.current_dir().join(name);
        debug!("opening new file {}", path.display());
        self.file = Some(OpenFile {
            out: File::create(&path)?,
            path,
            written: 0,
            checksum: self.config.checksum.map(|kind| kind.start()),
        });
        Ok(())
    }

    fn handle_data(&mut self, data: &[u8], more_expected: bool) -> io::Result<usize> {
        let block = self.config.write_block_size.max(1);
        let mut consumed = 0;

        while data.len() - consumed >= block {
            self.timed_write(&data[consumed..consumed + block])?;
            consumed += block;
        }

        // A short remainder waits for more data unless the file is done.
        if !more_expected && consumed < data.len() {
            self.timed_write(&data[consumed..])?;
            consumed = data.len();
        }

        self.tree.handle_data(&data[..consumed], more_expected)?;
        Ok(consumed)
    }

    fn end_file(&mut self) -> io::Result<()> {
        let OpenFile {
            mut out,
            path,
            written,
            checksum,
        } = self
            .file
            .take()
            .ok_or_else(|| io::Error::other("end_file without an open file"))?;

        debug!("closing file {}", path.display());
        out.flush()?;
        drop(out);

        self.written.push(WrittenFile {
            container: self.dirs.join("/"),
            path,
            size: written,
            checksum: checksum.map(|sum| sum.finalize()),
        });
        self.tree.end_file()
    }
}
