#![warn(clippy::pedantic)]

pub mod config;
pub mod encoder;
pub mod error;
pub mod reader;
pub mod size;
pub mod tar_export;

pub use config::EncoderConfig;
pub use encoder::StreamEncoder;
pub use error::EncodeError;
pub use reader::ContainerReader;
pub use size::compute_total_size;
pub use tar_export::{tar_size, write_tar};
