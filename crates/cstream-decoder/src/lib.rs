#![warn(clippy::pedantic)]

pub mod checksum;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fs_sink;
pub mod sink;
pub mod tree_sink;

pub use checksum::{ChecksumKind, RollingChecksum};
pub use config::{DecoderConfig, FilesystemSinkConfig};
pub use decoder::{DecodeStats, StreamDecoder, decode_tree};
pub use error::DecodeError;
pub use fs_sink::{FilesystemSink, WrittenFile};
pub use sink::ContainerEventSink;
pub use tree_sink::TreeBuildingSink;
