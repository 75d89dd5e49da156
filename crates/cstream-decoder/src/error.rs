use cstream_wire::WireError;

/// Errors that abort a decode.
///
/// None of these are retried internally; whatever a sink already wrote to
/// disk stays there for the caller to clean up or inspect.
///
/// ```text
///   DecodeError
///   ├── MalformedHeader(WireError) ← part headers unusable
///   ├── HeaderTooLarge             ← no blank line within the header limit
///   ├── FileOutsideContainer       ← the stream opens with a file part
///   ├── UnexpectedBytes            ← file data with no container open
///   ├── TruncatedStream            ← source ran dry before the root container closed
///   ├── SinkLeftover               ← sink kept bytes back on the last call for a file
///   ├── SinkOverconsumed           ← sink claims more bytes than it was offered
///   ├── Sink(io::Error)            ← sink failed (filesystem, bad name, ...)
///   └── Io(io::Error)              ← source read failed
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A part's headers parse but announce neither a usable container nor
    /// a file.
    #[error("malformed part header at offset {offset}: {source}")]
    MalformedHeader {
        offset: u64,
        #[source]
        source: WireError,
    },

    /// The blank line ending a header block did not show up within
    /// [`DecoderConfig::max_header_size`](crate::DecoderConfig) bytes.
    #[error("part header at offset {offset} exceeds {limit} bytes")]
    HeaderTooLarge { offset: u64, limit: usize },

    /// The outermost part is a file; a stream must start with a container.
    #[error("file part {name:?} found outside of any container")]
    FileOutsideContainer { name: String },

    /// Bytes arrived that no open part can account for.
    #[error("expected {expected} at offset {offset}")]
    UnexpectedBytes { offset: u64, expected: &'static str },

    /// The source was exhausted (or the declared length reached) before the
    /// final delimiter of the outermost container.
    #[error("stream truncated after {bytes_read} of {declared_len} declared bytes")]
    TruncatedStream { bytes_read: u64, declared_len: u64 },

    /// The sink returned a leftover although no more data for the file
    /// was coming.
    #[error("sink left {unconsumed} bytes unconsumed at the end of a file")]
    SinkLeftover { unconsumed: usize },

    /// The sink reported consuming more bytes than it was handed.
    #[error("sink consumed {consumed} bytes but only {offered} were offered")]
    SinkOverconsumed { consumed: usize, offered: usize },

    /// The sink failed to process an event.
    #[error("sink failed: {0}")]
    Sink(#[source] std::io::Error),

    /// Reading from the source failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
