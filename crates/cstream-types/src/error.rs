/// Errors raised while building or validating a container tree.
///
/// ```text
///   TypeError
///   ├── InvalidName   ← name would corrupt the framing or escape a directory
///   ├── NotADirectory ← from_directory called on something else
///   └── Io            ← from the filesystem walk
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("{path} is not a directory")]
    NotADirectory { path: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
