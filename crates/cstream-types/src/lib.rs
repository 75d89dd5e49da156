#![warn(clippy::pedantic)]

pub mod container;
pub mod error;
pub mod file_entry;
pub mod name;
pub mod source;

pub use container::Container;
pub use error::TypeError;
pub use file_entry::FileEntry;
pub use source::DataSource;
