use crate::error::TypeError;

/// Check that `name` can be written inside a quoted header parameter.
///
/// Quotes and line breaks would end the parameter or the header line early.
/// A backslash would be read back as an escape. NUL bytes are refused by
/// every filesystem the archive writes to.
///
/// # Errors
///
/// Returns [`TypeError::InvalidName`] describing the first problem found.
pub fn validate_name(name: &str) -> Result<(), TypeError> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.contains('"') {
        Some("name contains a double quote")
    } else if name.contains('\\') {
        Some("name contains a backslash")
    } else if name.contains(['\r', '\n']) {
        Some("name contains a line break")
    } else if name.contains('\0') {
        Some("name contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(TypeError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Whether `name` is safe to use as a single path component when unpacking.
///
/// Names arrive from the peer, so anything that could climb out of the
/// destination directory or address a nested path is refused.
pub fn is_safe_path_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names() {
        validate_name("obs-2015-03-02T10:00:00.fits").unwrap();
        validate_name("with spaces; and semicolons").unwrap();
    }

    #[test]
    fn rejects_framing_breakers() {
        for bad in ["", "a\"b", "a\r\nb", "nul\0", "back\\slash"] {
            assert!(validate_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn path_components() {
        assert!(is_safe_path_component("job42"));
        assert!(is_safe_path_component("..hidden"));
        for bad in ["", ".", "..", "a/b", "..\\x", "/etc"] {
            assert!(!is_safe_path_component(bad), "{bad:?} should be refused");
        }
    }
}
