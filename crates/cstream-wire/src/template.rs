use std::io::{self, Write};

use crate::boundary::{BOUNDARY_LEN, Boundary};

// Both the encoder's output and its up-front size prediction are derived
// from the templates below. Editing a literal here changes both sides at
// once; there is no second copy of these strings anywhere else.

/// One piece of a header template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Piece {
    /// Fixed text, emitted verbatim.
    Lit(&'static str),
    /// The container or file name.
    Name,
    /// The file's mime type.
    MimeType,
    /// The boundary token of the current level ([`BOUNDARY_LEN`] bytes).
    Boundary,
}

/// A fixed header or delimiter layout.
///
/// ```text
/// CONTAINER_HEADERS  MIME-Version: 1.0⏎
///                    Content-Type: multipart/mixed; container_name="<name>"; boundary="<b>"⏎
///                    ⏎
/// FILE_HEADERS       Content-Type: <mime>⏎
///                    Content-Disposition: attachment; filename="<name>"⏎
///                    ⏎
/// DELIMITER          ⏎--<b>⏎
/// FINAL_DELIMITER    ⏎--<b>--
/// ```
///
/// (`⏎` is CRLF.)
#[derive(Clone, Copy, Debug)]
pub struct Template {
    pieces: &'static [Piece],
}

/// Values substituted into a [`Template`] when it is rendered.
#[derive(Clone, Copy, Debug, Default)]
pub struct Fields<'a> {
    pub name: &'a str,
    pub mime_type: &'a str,
    pub boundary: Option<&'a Boundary>,
}

impl<'a> Fields<'a> {
    pub fn container(name: &'a str, boundary: &'a Boundary) -> Self {
        Self {
            name,
            mime_type: "",
            boundary: Some(boundary),
        }
    }

    pub fn file(name: &'a str, mime_type: &'a str) -> Self {
        Self {
            name,
            mime_type,
            boundary: None,
        }
    }

    pub fn boundary(boundary: &'a Boundary) -> Self {
        Self {
            name: "",
            mime_type: "",
            boundary: Some(boundary),
        }
    }
}

pub const CONTAINER_HEADERS: Template = Template::new(&[
    Piece::Lit("MIME-Version: 1.0\r\n"),
    Piece::Lit("Content-Type: multipart/mixed; container_name=\""),
    Piece::Name,
    Piece::Lit("\"; boundary=\""),
    Piece::Boundary,
    Piece::Lit("\"\r\n\r\n"),
]);

pub const FILE_HEADERS: Template = Template::new(&[
    Piece::Lit("Content-Type: "),
    Piece::MimeType,
    Piece::Lit("\r\nContent-Disposition: attachment; filename=\""),
    Piece::Name,
    Piece::Lit("\"\r\n\r\n"),
]);

pub const DELIMITER: Template = Template::new(&[
    Piece::Lit("\r\n--"),
    Piece::Boundary,
    Piece::Lit("\r\n"),
]);

pub const FINAL_DELIMITER: Template = Template::new(&[
    Piece::Lit("\r\n--"),
    Piece::Boundary,
    Piece::Lit("--"),
]);

impl Template {
    #[must_use]
    pub const fn new(pieces: &'static [Piece]) -> Self {
        Self { pieces }
    }

    #[must_use]
    pub fn pieces(&self) -> &'static [Piece] {
        self.pieces
    }

    /// Number of bytes [`render`](Self::render) emits for the given name and
    /// mime type with a generated boundary.
    #[must_use]
    pub fn len(&self, name: &str, mime_type: &str) -> u64 {
        self.pieces
            .iter()
            .map(|piece| {
                let n = match piece {
                    Piece::Lit(text) => text.len(),
                    Piece::Name => name.len(),
                    Piece::MimeType => mime_type.len(),
                    Piece::Boundary => BOUNDARY_LEN,
                };
                n as u64
            })
            .sum()
    }

    /// Length of a template that only depends on the boundary.
    #[must_use]
    pub fn fixed_len(&self) -> u64 {
        self.len("", "")
    }

    /// Write the template with `fields` substituted, returning the number of
    /// bytes written.
    ///
    /// # Errors
    ///
    /// Propagates write failures from `out`. A template with a boundary
    /// piece rendered without a boundary yields
    /// [`io::ErrorKind::InvalidInput`].
    pub fn render<W: Write + ?Sized>(&self, fields: &Fields<'_>, out: &mut W) -> io::Result<u64> {
        let mut written = 0u64;
        for piece in self.pieces {
            let bytes = match piece {
                Piece::Lit(text) => text.as_bytes(),
                Piece::Name => fields.name.as_bytes(),
                Piece::MimeType => fields.mime_type.as_bytes(),
                Piece::Boundary => fields
                    .boundary
                    .ok_or_else(|| {
                        io::Error::new(io::ErrorKind::InvalidInput, "template needs a boundary")
                    })?
                    .as_bytes(),
            };
            out.write_all(bytes)?;
            written += bytes.len() as u64;
        }
        Ok(written)
    }

    /// Render into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Same as [`render`](Self::render); writing into a `Vec` itself cannot
    /// fail.
    pub fn to_vec(&self, fields: &Fields<'_>) -> io::Result<Vec<u8>> {
        let capacity = usize::try_from(self.len(fields.name, fields.mime_type)).unwrap_or(0);
        let mut out = Vec::with_capacity(capacity);
        self.render(fields, &mut out)?;
        Ok(out)
    }
}
