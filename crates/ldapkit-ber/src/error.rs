//! Error types for BER operations.

use crate::identifier::Identifier;

/// Result type alias for BER operations.
pub type Result<T> = std::result::Result<T, Error>;

/// BER error types.
///
/// Framing errors describe bytes that cannot be split into tag/length/value
/// nodes at all. Consistency errors describe well-framed nodes that do not
/// have the shape the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Input ended before a complete element was read.
    #[error("Truncated input at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        /// Offset of the element being read.
        offset: usize,
        /// Bytes required to continue.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// Length octets could not be interpreted.
    #[error("Malformed length at offset {offset}: {message}")]
    MalformedLength {
        /// Offset of the first length octet.
        offset: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// The indefinite length form (0x80) was used.
    #[error("Indefinite length is not supported (offset {0})")]
    IndefiniteLength(usize),

    /// The declared length is larger than the configured maximum.
    #[error("Element length {length} exceeds maximum of {max} bytes")]
    LengthOverflow {
        /// Declared length.
        length: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Identifier octets could not be interpreted.
    #[error("Malformed identifier at offset {offset}: {message}")]
    MalformedIdentifier {
        /// Offset of the identifier.
        offset: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// A high-tag-number form encodes a tag number that does not fit in 32 bits.
    #[error("Tag number overflow at offset {0}")]
    TagNumberOverflow(usize),

    /// Constructed nesting is deeper than the configured maximum.
    #[error("Nesting depth exceeds maximum of {0}")]
    DepthExceeded(usize),

    /// Bytes remained after a complete element where none were expected.
    #[error("{0} trailing bytes after element")]
    TrailingBytes(usize),

    /// An element carried a different tag than the grammar requires.
    #[error("{context}: expected {expected}, found {found}")]
    UnexpectedTag {
        /// Grammar production being decoded.
        context: &'static str,
        /// Required identifier.
        expected: Identifier,
        /// Identifier actually present.
        found: Identifier,
    },

    /// A required element was absent at its position.
    #[error("{context}: missing {expected}")]
    MissingElement {
        /// Grammar production being decoded.
        context: &'static str,
        /// Description of the missing field.
        expected: &'static str,
    },

    /// A SEQUENCE held more children than its grammar allows.
    #[error("{context}: {remaining} unexpected trailing elements")]
    UnexpectedElement {
        /// Grammar production being decoded.
        context: &'static str,
        /// Children left unconsumed.
        remaining: usize,
    },

    /// A primitive element was required.
    #[error("Expected primitive encoding for {0}")]
    NotPrimitive(Identifier),

    /// A constructed element was required.
    #[error("Expected constructed encoding for {0}")]
    NotConstructed(Identifier),

    /// Primitive content is not a valid value of its type.
    #[error("Invalid {kind} value: {message}")]
    InvalidValue {
        /// ASN.1 type name.
        kind: &'static str,
        /// Description of what went wrong.
        message: String,
    },
}

impl Error {
    /// Returns `true` for errors where the bytes could not be framed as TLV nodes.
    ///
    /// Framing errors are fatal to the whole enclosing decode. The remaining
    /// errors concern a single structurally valid node.
    #[must_use]
    pub const fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::MalformedLength { .. }
                | Self::IndefiniteLength(_)
                | Self::LengthOverflow { .. }
                | Self::MalformedIdentifier { .. }
                | Self::TagNumberOverflow(_)
                | Self::DepthExceeded(_)
                | Self::TrailingBytes(_)
        )
    }

    pub(crate) fn invalid(kind: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            kind,
            message: message.into(),
        }
    }
}
