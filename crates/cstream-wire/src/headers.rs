use crate::boundary::Boundary;
use crate::error::WireError;
use crate::{CONTAINER_MEDIA_TYPE, DEFAULT_FILE_MEDIA_TYPE};

/// What a part announces itself as, once its headers are parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartKind {
    /// A nested container; its parts are delimited by `boundary`.
    Container { name: String, boundary: Boundary },
    /// A file; raw data follows the header block.
    File { name: String, mime_type: String },
}

/// The header block of a single part.
///
/// Header names are matched case-insensitively. Continuation lines (lines
/// starting with a space or tab) are folded into the previous header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartHeaders {
    entries: Vec<(String, String)>,
}

impl PartHeaders {
    /// Parse a header block. `block` holds the header lines up to, and
    /// optionally including, the terminating empty line.
    ///
    /// # Errors
    ///
    /// - [`WireError::InvalidUtf8`] if the block is not UTF-8.
    /// - [`WireError::MalformedHeaderLine`] for a line without a colon, or a
    ///   continuation line with nothing to continue.
    pub fn parse(block: &[u8]) -> Result<Self, WireError> {
        let text = std::str::from_utf8(block).map_err(|_| WireError::InvalidUtf8)?;
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in text.split("\r\n") {
            if line.is_empty() {
                continue;
            }

            if line.starts_with([' ', '\t']) {
                let Some((_, value)) = entries.last_mut() else {
                    return Err(WireError::MalformedHeaderLine {
                        line: line.to_string(),
                    });
                };
                value.push(' ');
                value.push_str(line.trim());
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(WireError::MalformedHeaderLine {
                    line: line.to_string(),
                });
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(WireError::MalformedHeaderLine {
                    line: line.to_string(),
                });
            }
            entries.push((name.to_ascii_lowercase(), value.trim().to_string()));
        }

        Ok(Self { entries })
    }

    /// Raw value of the first header called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decide whether this part opens a nested container or carries a file.
    ///
    /// # Errors
    ///
    /// - [`WireError::MissingContainerParam`] for a `multipart/mixed` part
    ///   without `boundary` or `container_name`.
    /// - [`WireError::InvalidBoundary`] if the boundary is unusable.
    /// - [`WireError::UnknownPart`] if the part carries no `filename`.
    pub fn classify(&self) -> Result<PartKind, WireError> {
        let content_type = self.get("content-type").map(HeaderValue::parse);

        if let Some(ct) = &content_type
            && ct.value.eq_ignore_ascii_case(CONTAINER_MEDIA_TYPE)
        {
            let boundary = ct
                .param("boundary")
                .filter(|b| !b.is_empty())
                .ok_or(WireError::MissingContainerParam { param: "boundary" })?;
            let name = ct
                .param("container_name")
                .filter(|n| !n.is_empty())
                .ok_or(WireError::MissingContainerParam {
                    param: "container_name",
                })?;
            return Ok(PartKind::Container {
                name: name.to_string(),
                boundary: Boundary::parse(boundary)?,
            });
        }

        let filename = self
            .get("content-disposition")
            .map(HeaderValue::parse)
            .and_then(|cd| cd.param("filename").map(str::to_string))
            .filter(|n| !n.is_empty())
            .ok_or(WireError::UnknownPart)?;

        let mime_type = self
            .get("content-type")
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_FILE_MEDIA_TYPE);

        Ok(PartKind::File {
            name: filename,
            mime_type: mime_type.to_string(),
        })
    }
}

/// A structured header value: `value; key=val; key="quoted val"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderValue {
    pub value: String,
    pub params: Vec<(String, String)>,
}

impl HeaderValue {
    /// Split a raw header value into its leading value and parameters.
    /// Quoted parameter values may contain `;` and backslash escapes.
    pub fn parse(raw: &str) -> Self {
        let mut segments = split_unquoted(raw, ';').into_iter();
        let value = segments.next().unwrap_or_default().trim().to_string();

        let params = segments
            .filter_map(|segment| {
                let (key, val) = segment.split_once('=')?;
                Some((key.trim().to_ascii_lowercase(), unquote(val.trim())))
            })
            .collect();

        Self { value, params }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

fn split_unquoted(raw: &str, sep: char) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in raw.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c == sep && !in_quotes => out.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    out.push(current);
    out
}

fn unquote(val: &str) -> String {
    let Some(inner) = val.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return val.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
