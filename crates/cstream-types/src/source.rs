use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

/// Factory producing a fresh reader over a file's contents.
pub type Opener = Arc<dyn Fn() -> io::Result<Box<dyn Read + Send>> + Send + Sync>;

/// Where a [`FileEntry`](crate::FileEntry)'s bytes come from.
///
/// Sources are opened on demand, so describing a tree never reads file
/// contents, and the same tree can be encoded more than once.
#[derive(Clone, Default)]
pub enum DataSource {
    /// No data attached (decoded structure, or a zero-length file).
    #[default]
    Empty,
    /// Bytes held in memory.
    Memory(Arc<[u8]>),
    /// A file on the local filesystem.
    Path(PathBuf),
    /// Anything else that can hand out a stream, e.g. a remote fetch.
    Opener(Opener),
}

impl DataSource {
    /// Open a reader positioned at the start of the data.
    ///
    /// # Errors
    ///
    /// Propagates failures from opening the file or calling the opener.
    pub fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        match self {
            Self::Empty => Ok(Box::new(io::empty())),
            Self::Memory(bytes) => Ok(Box::new(&bytes[..])),
            Self::Path(path) => Ok(Box::new(File::open(path)?)),
            Self::Opener(open) => (**open)(),
        }
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Opener(_) => f.write_str("Opener(..)"),
        }
    }
}
