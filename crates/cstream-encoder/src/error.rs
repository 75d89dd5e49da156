use cstream_types::TypeError;

/// Errors raised while encoding a container tree.
///
/// ```text
///   EncodeError
///   ├── InvalidName        ← a name would corrupt the header framing
///   ├── InvalidMimeType    ← mime type empty, multi-line, or multipart/mixed
///   ├── ProtocolViolation  ← streaming API used out of order
///   ├── SizeMismatch       ← bytes emitted differ from compute_total_size
///   ├── FileSizeMismatch   ← a data source yielded more/fewer bytes than declared
///   ├── UnsafeTarPath      ← entry path cannot be stored in a ustar header
///   └── Io(std::io::Error) ← sink or data source failure
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error(transparent)]
    InvalidName(#[from] TypeError),

    #[error("file {file:?} has unusable mime type {mime_type:?}")]
    InvalidMimeType { file: String, mime_type: String },

    #[error("encoder used out of order: {0}")]
    ProtocolViolation(String),

    #[error("emitted {actual} bytes but {expected} were announced")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("file {file} yielded {actual} bytes, {declared} declared")]
    FileSizeMismatch {
        file: String,
        declared: u64,
        actual: u64,
    },

    #[error("cannot store {path:?} in a tar archive: {reason}")]
    UnsafeTarPath { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EncodeError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }
}
