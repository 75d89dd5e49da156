use crate::checksum::ChecksumKind;

/// Default number of bytes requested from the source per read.
pub const DEFAULT_READ_BLOCK_SIZE: usize = 64 * 1024;

/// Default cap on a single part's header block.
pub const DEFAULT_MAX_HEADER_SIZE: usize = 16 * 1024;

/// Default size of the blocks a [`FilesystemSink`](crate::FilesystemSink)
/// writes.
pub const DEFAULT_WRITE_BLOCK_SIZE: usize = 64 * 1024;

/// Tuning for [`StreamDecoder`](crate::StreamDecoder).
///
/// ```text
/// ┌─────────────────┬────────────────────────────────────────────────┐
/// │ Field           │ Purpose                                        │
/// ├─────────────────┼────────────────────────────────────────────────┤
/// │ read_block_size │ Upper bound on bytes requested per read() call │
/// │ max_header_size │ Largest header block accepted before failing   │
/// └─────────────────┴────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    pub read_block_size: usize,
    pub max_header_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            read_block_size: DEFAULT_READ_BLOCK_SIZE,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
        }
    }
}

/// Tuning for [`FilesystemSink`](crate::FilesystemSink).
///
/// Data is written in `write_block_size` pieces; a shorter remainder is
/// handed back to the decoder until more data, or the end of the file,
/// arrives. When `checksum` is set every written block is fed to a rolling
/// checksum whose final value is recorded per file.
#[derive(Clone, Copy, Debug)]
pub struct FilesystemSinkConfig {
    pub write_block_size: usize,
    pub checksum: Option<ChecksumKind>,
}

impl Default for FilesystemSinkConfig {
    fn default() -> Self {
        Self {
            write_block_size: DEFAULT_WRITE_BLOCK_SIZE,
            checksum: None,
        }
    }
}
