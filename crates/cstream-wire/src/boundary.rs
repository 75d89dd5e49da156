use std::fmt;

use rand::Rng;
use rand::distr::Alphanumeric;

use crate::error::WireError;

/// Length of every boundary token the encoder generates.
///
/// The size prediction relies on this being fixed: the boundary piece of
/// each [`Template`](crate::Template) always contributes exactly this many
/// bytes.
pub const BOUNDARY_LEN: usize = 10;

/// Longest boundary accepted off the wire (RFC 2046 §5.1.1).
pub const MAX_WIRE_BOUNDARY_LEN: usize = 70;

/// A boundary token delimiting the parts of one container level.
///
/// Tokens produced by [`Boundary::generate`] are exactly [`BOUNDARY_LEN`]
/// alphanumeric characters. Tokens obtained through [`Boundary::parse`]
/// come from a peer and only have to be usable as a delimiter, so their
/// length may differ.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Boundary(String);

impl Boundary {
    /// Draw a fresh token from `rng`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let token: String = (0..BOUNDARY_LEN)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect();
        Self(token)
    }

    /// Validate a token announced by a peer.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidBoundary`] if the token is empty, longer
    /// than [`MAX_WIRE_BOUNDARY_LEN`], or contains anything other than
    /// printable ASCII excluding `"`.
    pub fn parse(token: &str) -> Result<Self, WireError> {
        let usable = !token.is_empty()
            && token.len() <= MAX_WIRE_BOUNDARY_LEN
            && token.bytes().all(|b| b.is_ascii_graphic() && b != b'"');
        if usable {
            Ok(Self(token.to_string()))
        } else {
            Err(WireError::InvalidBoundary {
                token: token.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// `CRLF--boundary`: the prefix shared by both delimiter forms, which is
    /// what terminates file data.
    pub fn data_terminator(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() + 4);
        out.extend_from_slice(b"\r\n--");
        out.extend_from_slice(self.as_bytes());
        out
    }

    /// `CRLF--boundary CRLF`: more parts follow at this level.
    pub fn delimiter(&self) -> Vec<u8> {
        let mut out = self.data_terminator();
        out.extend_from_slice(b"\r\n");
        out
    }

    /// `CRLF--boundary--`: this level is closed.
    pub fn final_delimiter(&self) -> Vec<u8> {
        let mut out = self.data_terminator();
        out.extend_from_slice(b"--");
        out
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
