#![warn(clippy::pedantic)]

pub mod boundary;
pub mod error;
pub mod headers;
pub mod template;

pub use boundary::{BOUNDARY_LEN, Boundary};
pub use error::WireError;
pub use headers::{PartHeaders, PartKind};
pub use template::{Fields, Template};

/// Line terminator used throughout the wire format.
pub const CRLF: &[u8] = b"\r\n";

/// Marks the end of a part's header block (an empty header line).
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Media type announcing a container part.
pub const CONTAINER_MEDIA_TYPE: &str = "multipart/mixed";

/// Media type assumed for file parts that carry no `Content-Type`.
pub const DEFAULT_FILE_MEDIA_TYPE: &str = "application/octet-stream";
