/// Default number of bytes pulled from a file's data source per read.
pub const DEFAULT_READ_BLOCK_SIZE: usize = 64 * 1024;

/// Tuning for [`StreamEncoder`](crate::StreamEncoder).
///
/// ```text
/// ┌─────────────────┬─────────────────────────────────────────────────┐
/// │ Field           │ Purpose                                         │
/// ├─────────────────┼─────────────────────────────────────────────────┤
/// │ read_block_size │ Bytes requested from a DataSource per read()    │
/// │                 │ while encode_all / ContainerReader copy a file  │
/// └─────────────────┴─────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    pub read_block_size: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            read_block_size: DEFAULT_READ_BLOCK_SIZE,
        }
    }
}
