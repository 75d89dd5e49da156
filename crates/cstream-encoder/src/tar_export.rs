use std::io::{self, Read, Write};

use cstream_types::name::is_safe_path_component;
use cstream_types::{Container, FileEntry};
use log::{debug, info};
use tar::{Builder, EntryType, Header};

use crate::error::EncodeError;

const BLOCK: u64 = 512;

/// Size of the ustar archive [`write_tar`] produces for `root`.
///
/// ```text
/// ┌──────────────────────────────┬──────────────────────────────────┐
/// │ root directory               │ 512                              │
/// │ per nested directory         │ 512                              │
/// │ per file                     │ 512 + size rounded up to 512     │
/// │ end of archive               │ 1024                             │
/// └──────────────────────────────┴──────────────────────────────────┘
/// ```
pub fn tar_size(root: &Container) -> u64 {
    entries_size(root) + 2 * BLOCK
}

fn entries_size(container: &Container) -> u64 {
    let files: u64 = container
        .files()
        .iter()
        .map(|f| BLOCK + f.size().div_ceil(BLOCK) * BLOCK)
        .sum();
    let nested: u64 = container.containers().iter().map(entries_size).sum();
    BLOCK + files + nested
}

/// Write `root` as a ustar archive: one directory per container, one
/// regular file per file entry, all with mtime 0 so the output only
/// depends on the tree.
///
/// Every path is checked before the first byte is written.
///
/// # Errors
///
/// [`EncodeError::UnsafeTarPath`] for names that cannot be archived,
/// [`EncodeError::FileSizeMismatch`] when a source does not yield its
/// declared size, [`EncodeError::Io`] otherwise.
pub fn write_tar<W: Write>(root: &Container, sink: W) -> Result<(W, u64), EncodeError> {
    check_paths(root, "")?;

    let mut builder = Builder::new(Counting {
        inner: sink,
        count: 0,
    });
    append_container(&mut builder, root, "")?;
    let mut out = builder.into_inner()?;
    out.flush()?;

    let expected = tar_size(root);
    if out.count != expected {
        return Err(EncodeError::SizeMismatch {
            expected,
            actual: out.count,
        });
    }
    info!("wrote tar archive of {} bytes", out.count);
    Ok((out.inner, out.count))
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn check_paths(container: &Container, parent: &str) -> Result<(), EncodeError> {
    let dir = join(parent, container.name());
    check_path(container.name(), &dir)?;
    for file in container.files() {
        check_path(file.name(), &join(&dir, file.name()))?;
    }
    container
        .containers()
        .iter()
        .try_for_each(|child| check_paths(child, &dir))
}

fn check_path(name: &str, path: &str) -> Result<(), EncodeError> {
    if !is_safe_path_component(name) {
        return Err(EncodeError::UnsafeTarPath {
            path: path.to_string(),
            reason: "not a single relative path component".to_string(),
        });
    }
    Header::new_ustar()
        .set_path(path)
        .map_err(|e| EncodeError::UnsafeTarPath {
            path: path.to_string(),
            reason: e.to_string(),
        })
}

fn append_container<W: Write>(
    builder: &mut Builder<W>,
    container: &Container,
    parent: &str,
) -> Result<(), EncodeError> {
    let dir = join(parent, container.name());
    let mut header = Header::new_ustar();
    header.set_path(&dir)?;
    header.set_entry_type(EntryType::Directory);
    header.set_size(0);
    header.set_mode(0o755);
    header.set_mtime(0);
    header.set_cksum();
    builder.append(&header, io::empty())?;
    debug!("tar directory {dir}");

    for child in container.containers() {
        append_container(builder, child, &dir)?;
    }
    for file in container.files() {
        append_file(builder, file, &join(&dir, file.name()))?;
    }
    Ok(())
}

fn append_file<W: Write>(
    builder: &mut Builder<W>,
    file: &FileEntry,
    path: &str,
) -> Result<(), EncodeError> {
    let mut header = Header::new_ustar();
    header.set_path(path)?;
    header.set_entry_type(EntryType::Regular);
    header.set_size(file.size());
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();

    let mut data = Counting {
        inner: file.source().open()?.take(file.size()),
        count: 0,
    };
    builder.append(&header, &mut data)?;

    let mismatch = |actual| EncodeError::FileSizeMismatch {
        file: path.to_string(),
        declared: file.size(),
        actual,
    };
    if data.count != file.size() {
        return Err(mismatch(data.count));
    }
    let mut rest = data.inner.into_inner();
    let extra = io::copy(&mut rest, &mut io::sink())?;
    if extra > 0 {
        return Err(mismatch(file.size() + extra));
    }
    debug!("tar file {path} ({} bytes)", file.size());
    Ok(())
}

/// Counts the bytes passing through.
struct Counting<T> {
    inner: T,
    count: u64,
}

impl<T: Write> Write for Counting<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<T: Read> Read for Counting<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
