/// Errors raised while reading container-stream framing off the wire.
///
/// ```text
///   WireError
///   ├── InvalidUtf8          ← header block is not UTF-8
///   ├── MalformedHeaderLine  ← a header line without a `name: value` shape
///   ├── MissingContainerParam← multipart part without boundary/container_name
///   ├── InvalidBoundary      ← boundary token empty, too long, or not printable
///   └── UnknownPart          ← part is neither a container nor a file
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The header block contained bytes that are not valid UTF-8.
    #[error("part headers are not valid UTF-8")]
    InvalidUtf8,

    /// A header line did not have the `Name: value` form.
    #[error("malformed header line: {line:?}")]
    MalformedHeaderLine { line: String },

    /// A `multipart/mixed` part lacks one of its mandatory parameters.
    #[error("container part is missing the {param:?} parameter in its Content-Type header")]
    MissingContainerParam { param: &'static str },

    /// A boundary token read off the wire cannot be used as a delimiter.
    #[error("invalid boundary token {token:?}")]
    InvalidBoundary { token: String },

    /// The part declares neither a nested container nor a file.
    #[error("part declares neither a container nor a filename")]
    UnknownPart,
}
