use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::TypeError;
use crate::source::{DataSource, Opener};

/// A file inside a [`Container`](crate::Container).
///
/// Entries are immutable once built. `size` is authoritative: it is what
/// the encoder announces up front, so it must equal the number of bytes the
/// [`DataSource`] yields.
#[derive(Clone, Debug)]
pub struct FileEntry {
    name: String,
    mime_type: String,
    size: u64,
    source: DataSource,
}

impl FileEntry {
    /// An entry backed by an in-memory buffer; the size is the buffer length.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        let data: Arc<[u8]> = data.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: data.len() as u64,
            source: DataSource::Memory(data),
        }
    }

    /// An entry backed by a local file; the size is taken from its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::Io`] if the file's metadata cannot be read.
    pub fn from_path(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, TypeError> {
        let path = path.as_ref();
        let size = fs::metadata(path)?.len();
        Ok(Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            source: DataSource::Path(path.to_path_buf()),
        })
    }

    /// An entry whose data comes from `opener`. The caller vouches for
    /// `size`; the encoder fails with a size mismatch if the stream
    /// disagrees.
    pub fn from_opener(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size: u64,
        opener: Opener,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            source: DataSource::Opener(opener),
        }
    }

    /// Structure only: a decoded entry whose bytes were not retained.
    pub fn placeholder(name: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            source: DataSource::Empty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }
}
