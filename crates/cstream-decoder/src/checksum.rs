use std::fmt;
use std::str::FromStr;

/// A checksum updated block by block as file data is written.
///
/// The archive treats checksums as opaque strings; the algorithm is the
/// caller's choice.
pub trait RollingChecksum: Send {
    fn update(&mut self, data: &[u8]);

    /// Consume the state and render the final value.
    fn finalize(self: Box<Self>) -> String;
}

/// CRC-32 (IEEE), rendered as 8 lowercase hex digits.
#[derive(Default)]
pub struct Crc32(crc32fast::Hasher);

impl RollingChecksum for Crc32 {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> String {
        let Crc32(hasher) = *self;
        format!("{:08x}", hasher.finalize())
    }
}

/// BLAKE3, rendered as 64 lowercase hex digits.
#[derive(Default)]
pub struct Blake3(blake3::Hasher);

impl RollingChecksum for Blake3 {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> String {
        self.0.finalize().to_hex().to_string()
    }
}

/// Which checksum a [`FilesystemSink`](crate::FilesystemSink) computes.
#[derive(Clone, Copy)]
pub enum ChecksumKind {
    Crc32,
    Blake3,
    /// Any other algorithm, created fresh for each file.
    Custom(fn() -> Box<dyn RollingChecksum>),
}

impl ChecksumKind {
    /// Fresh checksum state for one file.
    pub fn start(self) -> Box<dyn RollingChecksum> {
        match self {
            Self::Crc32 => Box::new(Crc32::default()),
            Self::Blake3 => Box::new(Blake3::default()),
            Self::Custom(make) => make(),
        }
    }
}

impl fmt::Debug for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crc32 => f.write_str("Crc32"),
            Self::Blake3 => f.write_str("Blake3"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl FromStr for ChecksumKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crc32" | "crc" => Ok(Self::Crc32),
            "blake3" => Ok(Self::Blake3),
            _ => Err(format!("unknown checksum {s:?}, expected crc32|blake3")),
        }
    }
}
