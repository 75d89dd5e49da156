use std::io::{self, Read};

use cstream_types::Container;

use crate::config::EncoderConfig;
use crate::encoder::StreamEncoder;
use crate::error::EncodeError;

/// The encoded stream of a tree as a [`Read`] implementation.
///
/// Bytes are produced lazily: a `read` call runs the encoder just far
/// enough (one header, delimiter or block of file data) to have something
/// to return, so at most one `read_block_size` block is buffered at a time.
///
/// ```rust,no_run
/// # use cstream_encoder::ContainerReader;
/// # fn send(_: u64, _: &mut dyn std::io::Read) {}
/// # fn run(root: &cstream_types::Container) -> Result<(), cstream_encoder::EncodeError> {
/// let mut body = ContainerReader::new(root)?;
/// send(body.total_size(), &mut body);
/// # Ok(())
/// # }
/// ```
pub struct ContainerReader<'a> {
    encoder: StreamEncoder<'a, Vec<u8>>,
    pos: usize,
    done: bool,
}

impl<'a> ContainerReader<'a> {
    /// # Errors
    ///
    /// Same as [`StreamEncoder::new`].
    pub fn new(root: &'a Container) -> Result<Self, EncodeError> {
        Ok(Self {
            encoder: StreamEncoder::new(root, Vec::new())?,
            pos: 0,
            done: false,
        })
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.encoder = self.encoder.with_seed(seed);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EncoderConfig) -> Self {
        self.encoder = self.encoder.with_config(config);
        self
    }

    /// Length of the whole stream, known before the first read.
    pub fn total_size(&self) -> u64 {
        self.encoder.total_size()
    }
}

impl Read for ContainerReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let pending = &self.encoder.get_ref()[self.pos..];
            if !pending.is_empty() {
                let n = pending.len().min(buf.len());
                buf[..n].copy_from_slice(&pending[..n]);
                self.pos += n;
                return Ok(n);
            }
            if self.done {
                return Ok(0);
            }

            self.encoder.get_mut().clear();
            self.pos = 0;
            if !self.encoder.step().map_err(into_io)? {
                let actual = self.encoder.bytes_written();
                let expected = self.encoder.total_size();
                if actual != expected {
                    return Err(into_io(EncodeError::SizeMismatch { expected, actual }));
                }
                self.done = true;
            }
        }
    }
}

fn into_io(err: EncodeError) -> io::Error {
    match err {
        EncodeError::Io(e) => e,
        other => io::Error::other(other),
    }
}
