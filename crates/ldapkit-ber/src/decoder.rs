//! Decoding bytes into an [`Element`] tree.

use tracing::trace;

use crate::element::Element;
use crate::identifier::Identifier;
use crate::{Error, Result, length};

/// Default maximum nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default maximum declared length of a single element (16 MiB).
pub const DEFAULT_MAX_LENGTH: usize = 16 * 1024 * 1024;

/// Limits applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    max_depth: usize,
    max_length: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl DecoderConfig {
    /// Creates a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth of constructed elements.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the maximum declared length of any element.
    #[must_use]
    pub const fn max_length(mut self, length: usize) -> Self {
        self.max_length = length;
        self
    }

    /// Returns the configured maximum nesting depth.
    #[must_use]
    pub const fn depth_limit(&self) -> usize {
        self.max_depth
    }

    /// Returns the configured maximum element length.
    #[must_use]
    pub const fn length_limit(&self) -> usize {
        self.max_length
    }

    /// Decodes one element from the start of `input`.
    ///
    /// Returns the element and the number of bytes consumed. Bytes after the
    /// element are left alone.
    pub fn decode(&self, input: &[u8]) -> Result<(Element, usize)> {
        self.decode_at(input, 0, 0)
    }

    /// Decodes exactly one element, rejecting trailing bytes.
    pub fn decode_exact(&self, input: &[u8]) -> Result<Element> {
        let (element, used) = self.decode(input)?;
        if used != input.len() {
            return Err(Error::TrailingBytes(input.len() - used));
        }
        Ok(element)
    }

    /// Reads only the header of the element at the start of `input`.
    ///
    /// Returns the identifier, the header length and the content length.
    /// Useful to know how many bytes a complete element needs before all of
    /// them have arrived.
    pub fn peek_header(&self, input: &[u8]) -> Result<(Identifier, usize, usize)> {
        let (id, id_len) = Identifier::decode(input, 0)?;
        let (content_len, len_len) = length::decode(&input[id_len..], id_len)?;
        if content_len > self.max_length {
            return Err(Error::LengthOverflow {
                length: content_len,
                max: self.max_length,
            });
        }
        Ok((id, id_len + len_len, content_len))
    }

    fn decode_at(&self, input: &[u8], offset: usize, depth: usize) -> Result<(Element, usize)> {
        let (id, id_len) = Identifier::decode(input, offset)?;
        let (content_len, len_len) = length::decode(&input[id_len..], offset + id_len)?;
        if content_len > self.max_length {
            return Err(Error::LengthOverflow {
                length: content_len,
                max: self.max_length,
            });
        }

        let header = id_len + len_len;
        let available = input.len() - header;
        if content_len > available {
            return Err(Error::Truncated {
                offset,
                needed: content_len,
                available,
            });
        }
        let content = &input[header..header + content_len];

        if !id.is_constructed() {
            return Ok((Element::primitive(id, content), header + content_len));
        }

        if depth >= self.max_depth {
            return Err(Error::DepthExceeded(self.max_depth));
        }

        let mut children = Vec::new();
        let mut pos = 0;
        while pos < content.len() {
            let (child, used) =
                self.decode_at(&content[pos..], offset + header + pos, depth + 1)?;
            children.push(child);
            pos += used;
        }
        trace!(%id, children = children.len(), "Decoded constructed element");
        Ok((Element::constructed(id, children), header + content_len))
    }
}

/// Decodes one element with default limits.
pub fn decode(input: &[u8]) -> Result<(Element, usize)> {
    DecoderConfig::default().decode(input)
}

/// Decodes exactly one element with default limits.
pub fn decode_exact(input: &[u8]) -> Result<Element> {
    DecoderConfig::default().decode_exact(input)
}
