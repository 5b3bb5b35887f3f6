//! Cursor over filter text.
//!
//! The filter grammar is context sensitive (a `*` is structural in a value
//! but not in an attribute), so instead of a token stream the lexer offers
//! one read method per grammar position and the parser picks the right one.

use crate::{Error, Result};

/// Characters that end an attribute description.
const ATTRIBUTE_DELIMITERS: &[u8] = b"=~<>:()";

/// Relational operator of a simple item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Equal,
    /// `~=`
    Approx,
    /// `>=`
    GreaterOrEqual,
    /// `<=`
    LessOrEqual,
}

/// A raw assertion value together with its position in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawValue<'a> {
    /// Bytes between the operator and the closing parenthesis, trimmed.
    pub bytes: &'a [u8],
    /// Position of the first byte of `bytes`.
    pub position: usize,
}

/// Filter text cursor.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer at the start of `input`.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns true if only whitespace remains.
    pub fn is_eof(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    /// Peeks at the next non-whitespace byte.
    pub fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.input.get(self.pos).copied()
    }

    /// Consumes one byte.
    pub fn bump(&mut self) {
        self.pos = (self.pos + 1).min(self.input.len());
    }

    /// Consumes `expected` after optional whitespace.
    pub fn expect(&mut self, expected: u8) -> Result<()> {
        match self.peek() {
            Some(byte) if byte == expected => {
                self.bump();
                Ok(())
            }
            Some(byte) => Err(self.error(format!(
                "expected '{}', found '{}'",
                char::from(expected),
                char::from(byte)
            ))),
            None => Err(self.error(format!(
                "unexpected end of input, missing '{}'",
                char::from(expected)
            ))),
        }
    }

    /// Reads an attribute description up to the next delimiter.
    ///
    /// When `extensible` is set, `:` is not a delimiter so that the whole
    /// `attr:dn:rule` prefix is returned in one piece.
    pub fn read_description(&mut self, extensible: bool) -> (&'a str, usize) {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(&byte) = self.input.get(self.pos) {
            if ATTRIBUTE_DELIMITERS.contains(&byte) && !(extensible && byte == b':') {
                break;
            }
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or_default();
        (text.trim(), start)
    }

    /// Reads a relational operator.
    pub fn read_operator(&mut self) -> Result<Operator> {
        let start = self.pos;
        let first = self.input.get(self.pos).copied();
        let second = self.input.get(self.pos + 1).copied();
        let (operator, len) = match (first, second) {
            (Some(b'='), _) => (Operator::Equal, 1),
            (Some(b'~'), Some(b'=')) => (Operator::Approx, 2),
            (Some(b'>'), Some(b'=')) => (Operator::GreaterOrEqual, 2),
            (Some(b'<'), Some(b'=')) => (Operator::LessOrEqual, 2),
            (None, _) => return Err(self.error("unexpected end of input, missing operator")),
            _ => {
                return Err(Error::FilterSyntax {
                    position: start,
                    message: "invalid filter operator".to_string(),
                });
            }
        };
        self.pos += len;
        Ok(operator)
    }

    /// Reads an assertion value up to the first unescaped `)`.
    ///
    /// A backslash always takes the following byte with it, so `\)` does
    /// not end the value. The closing parenthesis is not consumed.
    pub fn read_value(&mut self) -> Result<RawValue<'a>> {
        let start = self.pos;
        loop {
            match self.input.get(self.pos) {
                None => {
                    return Err(self.error("unexpected end of input, missing ')'"));
                }
                Some(b')') => break,
                Some(b'(') => {
                    return Err(self.error("unescaped '(' in assertion value"));
                }
                Some(b'\\') => self.pos = (self.pos + 2).min(self.input.len()),
                Some(_) => self.pos += 1,
            }
        }

        let mut bytes = &self.input[start..self.pos];
        let mut position = start;
        while let [first, rest @ ..] = bytes {
            if !first.is_ascii_whitespace() {
                break;
            }
            bytes = rest;
            position += 1;
        }
        while let [rest @ .., last] = bytes {
            if !last.is_ascii_whitespace() {
                break;
            }
            bytes = rest;
        }
        Ok(RawValue { bytes, position })
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.input.get(self.pos) {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    /// Creates a syntax error at the current position.
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::FilterSyntax {
            position: self.pos,
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_description() {
        let mut lexer = Lexer::new(b" cn =Bob");
        assert_eq!(lexer.read_description(false), ("cn", 1));
        assert_eq!(lexer.read_operator().unwrap(), Operator::Equal);
    }

    #[test]
    fn test_extensible_description() {
        let mut lexer = Lexer::new(b"cn:dn:2.5.13.5:=x");
        assert_eq!(lexer.read_description(true).0, "cn:dn:2.5.13.5:");
        assert_eq!(lexer.position(), 15);
        assert!(Lexer::new(b":=x").read_operator().is_err());
    }

    #[test]
    fn test_operators() {
        for (text, op) in [
            (&b"~=x"[..], Operator::Approx),
            (b">=x", Operator::GreaterOrEqual),
            (b"<=x", Operator::LessOrEqual),
        ] {
            assert_eq!(Lexer::new(text).read_operator().unwrap(), op);
        }
        assert!(Lexer::new(b"<x").read_operator().is_err());
        assert!(Lexer::new(b"").read_operator().is_err());
    }

    #[test]
    fn test_read_value_stops_at_unescaped_paren() {
        let mut lexer = Lexer::new(b" a\\)b )rest");
        let value = lexer.read_value().unwrap();
        assert_eq!(value.bytes, b"a\\)b");
        assert_eq!(value.position, 1);
        assert_eq!(lexer.peek(), Some(b')'));
    }

    #[test]
    fn test_read_value_unterminated() {
        assert!(Lexer::new(b"Bob").read_value().is_err());
        assert!(Lexer::new(b"Bob\\)").read_value().is_err());
        assert!(Lexer::new(b"a(b)").read_value().is_err());
    }

    #[test]
    fn test_expect() {
        let mut lexer = Lexer::new(b"  (x");
        lexer.expect(b'(').unwrap();
        assert!(lexer.expect(b')').is_err());
    }
}
