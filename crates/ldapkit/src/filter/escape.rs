//! Assertion value escapes.
//!
//! Two forms are accepted when reading: `\xx` with two hex digits, and the
//! legacy `\*`, `\(`, `\)` and `\\`. Values are always written in the `\xx`
//! form.

use std::fmt::Write as _;

use crate::{Error, Result};

/// Decodes escapes in a raw assertion value.
///
/// `offset` is the position of `raw` in the filter text and is only used to
/// annotate errors.
pub fn unescape(raw: &[u8], offset: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let byte = raw[i];
        if byte != b'\\' {
            out.push(byte);
            i += 1;
            continue;
        }

        let hex = raw
            .get(i + 1..i + 3)
            .and_then(|pair| Some((hex_digit(pair[0])?, hex_digit(pair[1])?)));
        if let Some((high, low)) = hex {
            out.push((high << 4) | low);
            i += 3;
            continue;
        }

        match raw.get(i + 1) {
            Some(&c @ (b'*' | b'(' | b')' | b'\\')) => {
                out.push(c);
                i += 2;
            }
            Some(&c) => {
                return Err(Error::FilterSyntax {
                    position: offset + i,
                    message: format!("invalid escape sequence '\\{}'", char::from(c)),
                });
            }
            None => {
                return Err(Error::FilterSyntax {
                    position: offset + i,
                    message: "unterminated escape sequence".to_string(),
                });
            }
        }
    }
    Ok(out)
}

const fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Escapes an assertion value for use in filter text.
///
/// The filter metacharacters, NUL, control characters and every non-ASCII
/// byte are written as `\xx`.
#[must_use]
pub fn escape(value: &[u8]) -> String {
    let mut out = String::with_capacity(value.len());
    for &byte in value {
        match byte {
            b'*' | b'(' | b')' | b'\\' | 0x00..=0x1F | 0x7F..=0xFF => {
                let _ = write!(out, "\\{byte:02x}");
            }
            _ => out.push(char::from(byte)),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_escapes() {
        assert_eq!(unescape(b"Bob\\2a", 0).unwrap(), b"Bob*");
        assert_eq!(unescape(b"\\28x\\29", 0).unwrap(), b"(x)");
        assert_eq!(unescape(b"\\C3\\A9", 0).unwrap(), "é".as_bytes());
        assert_eq!(unescape(b"\\00", 0).unwrap(), vec![0]);
    }

    #[test]
    fn test_legacy_escapes() {
        assert_eq!(unescape(b"a\\*b", 0).unwrap(), b"a*b");
        assert_eq!(unescape(b"\\(\\)\\\\", 0).unwrap(), b"()\\");
    }

    #[test]
    fn test_hex_takes_precedence() {
        // "\\" followed by "5c" is a literal backslash then "5c" when escaped as a pair,
        // but "\5c" alone is the hex form of a backslash.
        assert_eq!(unescape(b"\\5c", 0).unwrap(), b"\\");
        assert_eq!(unescape(b"\\\\5c", 0).unwrap(), b"\\5c");
    }

    #[test]
    fn test_invalid_escapes() {
        let err = unescape(b"ab\\x", 10).unwrap_err();
        assert!(matches!(err, Error::FilterSyntax { position: 12, .. }));
        assert!(unescape(b"ab\\", 0).is_err());
        assert!(unescape(b"\\2", 0).is_err());
        assert!(unescape(b"\\2g", 0).is_err());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(b"Bob"), "Bob");
        assert_eq!(escape(b"a*b(c)\\"), "a\\2ab\\28c\\29\\5c");
        assert_eq!(escape("é".as_bytes()), "\\c3\\a9");
        assert_eq!(escape(&[0]), "\\00");
    }

    #[test]
    fn test_escape_unescape_inverse() {
        let value: Vec<u8> = (0..=255).collect();
        assert_eq!(unescape(escape(&value).as_bytes(), 0).unwrap(), value);
    }
}
