//! In-memory tree of BER elements.

use bytes::{Bytes, BytesMut};

use crate::identifier::Identifier;
use crate::{Error, Result, length, primitive};

/// Content of an element: raw octets or nested elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Content octets of a primitive element.
    Primitive(Vec<u8>),
    /// Children of a constructed element, in order.
    Constructed(Vec<Element>),
}

/// A single BER tag/length/value node.
///
/// The constructed flag of the identifier always agrees with the content
/// variant. Lengths are computed when encoding, so an element can be built
/// bottom-up and re-tagged freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    id: Identifier,
    content: Content,
}

impl Element {
    /// Creates a primitive element with the given identifier.
    #[must_use]
    pub fn primitive(id: Identifier, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.with_constructed(false),
            content: Content::Primitive(content.into()),
        }
    }

    /// Creates a constructed element with the given identifier.
    #[must_use]
    pub fn constructed(id: Identifier, children: Vec<Self>) -> Self {
        Self {
            id: id.with_constructed(true),
            content: Content::Constructed(children),
        }
    }

    /// BOOLEAN.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::primitive(Identifier::BOOLEAN, primitive::encode_bool(value))
    }

    /// INTEGER.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::primitive(Identifier::INTEGER, primitive::encode_integer(value))
    }

    /// ENUMERATED.
    #[must_use]
    pub fn enumerated(value: i64) -> Self {
        Self::primitive(Identifier::ENUMERATED, primitive::encode_integer(value))
    }

    /// OCTET STRING.
    #[must_use]
    pub fn octet_string(value: impl Into<Vec<u8>>) -> Self {
        Self::primitive(Identifier::OCTET_STRING, value)
    }

    /// OCTET STRING holding UTF-8 text.
    #[must_use]
    pub fn string(value: &str) -> Self {
        Self::octet_string(value.as_bytes())
    }

    /// NULL.
    #[must_use]
    pub fn null() -> Self {
        Self::primitive(Identifier::NULL, Vec::new())
    }

    /// OBJECT IDENTIFIER from dotted-decimal text.
    pub fn oid(dotted: &str) -> Result<Self> {
        Ok(Self::primitive(
            Identifier::OBJECT_IDENTIFIER,
            primitive::encode_oid(dotted)?,
        ))
    }

    /// SEQUENCE or SEQUENCE OF.
    #[must_use]
    pub fn sequence(children: Vec<Self>) -> Self {
        Self::constructed(Identifier::SEQUENCE, children)
    }

    /// SET or SET OF.
    #[must_use]
    pub fn set(children: Vec<Self>) -> Self {
        Self::constructed(Identifier::SET, children)
    }

    /// Replaces the tag (implicit tagging). The encoding form is kept.
    #[must_use]
    pub fn implicit(mut self, id: Identifier) -> Self {
        self.id = id.with_constructed(self.id.is_constructed());
        self
    }

    /// Wraps the element in a constructed element (explicit tagging).
    #[must_use]
    pub fn explicit(self, id: Identifier) -> Self {
        Self::constructed(id, vec![self])
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> Identifier {
        self.id
    }

    /// Returns the content.
    #[must_use]
    pub const fn content(&self) -> &Content {
        &self.content
    }

    /// Consumes the element, returning its content.
    #[must_use]
    pub fn into_content(self) -> Content {
        self.content
    }

    /// Returns `true` if the element carries the tag of `id`, ignoring form.
    #[must_use]
    pub fn has_tag(&self, id: Identifier) -> bool {
        self.id.same_tag(id)
    }

    /// Checks that the element carries the tag of `id`.
    pub fn expect_tag(&self, context: &'static str, id: Identifier) -> Result<&Self> {
        if self.has_tag(id) {
            Ok(self)
        } else {
            Err(Error::UnexpectedTag {
                context,
                expected: id,
                found: self.id,
            })
        }
    }

    /// Returns primitive content octets.
    pub fn as_octets(&self) -> Result<&[u8]> {
        match &self.content {
            Content::Primitive(bytes) => Ok(bytes),
            Content::Constructed(_) => Err(Error::NotPrimitive(self.id)),
        }
    }

    /// Returns the children of a constructed element.
    pub fn children(&self) -> Result<&[Self]> {
        match &self.content {
            Content::Constructed(children) => Ok(children),
            Content::Primitive(_) => Err(Error::NotConstructed(self.id)),
        }
    }

    /// Consumes a constructed element, returning its children.
    pub fn into_children(self) -> Result<Vec<Self>> {
        match self.content {
            Content::Constructed(children) => Ok(children),
            Content::Primitive(_) => Err(Error::NotConstructed(self.id)),
        }
    }

    /// Consumes a primitive element, returning its content octets.
    pub fn into_octets(self) -> Result<Vec<u8>> {
        match self.content {
            Content::Primitive(bytes) => Ok(bytes),
            Content::Constructed(_) => Err(Error::NotPrimitive(self.id)),
        }
    }

    /// Interprets primitive content as a BOOLEAN, whatever the tag.
    pub fn to_bool(&self) -> Result<bool> {
        primitive::decode_bool(self.as_octets()?)
    }

    /// Interprets primitive content as an INTEGER or ENUMERATED, whatever the tag.
    pub fn to_integer(&self) -> Result<i64> {
        primitive::decode_integer(self.as_octets()?)
    }

    /// Interprets content as an INTEGER that must fit in `i32`.
    pub fn to_i32(&self) -> Result<i32> {
        let value = self.to_integer()?;
        i32::try_from(value)
            .map_err(|_| Error::invalid("INTEGER", format!("{value} does not fit in 32 bits")))
    }

    /// Interprets primitive content as UTF-8 text, whatever the tag.
    pub fn to_utf8(&self) -> Result<String> {
        String::from_utf8(self.as_octets()?.to_vec())
            .map_err(|e| Error::invalid("UTF8String", e.to_string()))
    }

    /// Interprets primitive content as an OBJECT IDENTIFIER, whatever the tag.
    pub fn to_oid(&self) -> Result<String> {
        primitive::decode_oid(self.as_octets()?)
    }

    /// Length of the content octets.
    #[must_use]
    pub fn content_len(&self) -> usize {
        match &self.content {
            Content::Primitive(bytes) => bytes.len(),
            Content::Constructed(children) => children.iter().map(Self::encoded_len).sum(),
        }
    }

    /// Total length of the encoding: identifier, length and content octets.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let content = self.content_len();
        self.id.encoded_len() + length::encoded_len(content) + content
    }

    /// Appends the definite-length encoding to `buf`.
    pub fn encode_to(&self, buf: &mut BytesMut) {
        self.id.encode(buf);
        length::encode(self.content_len(), buf);
        match &self.content {
            Content::Primitive(bytes) => buf.extend_from_slice(bytes),
            Content::Constructed(children) => {
                for child in children {
                    child.encode_to(buf);
                }
            }
        }
    }

    /// Encodes the element into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_to(&mut buf);
        buf.freeze()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_encodings() {
        assert_eq!(&Element::boolean(true).to_bytes()[..], &[0x01, 0x01, 0xFF]);
        assert_eq!(&Element::integer(5).to_bytes()[..], &[0x02, 0x01, 0x05]);
        assert_eq!(&Element::enumerated(0).to_bytes()[..], &[0x0A, 0x01, 0x00]);
        assert_eq!(&Element::null().to_bytes()[..], &[0x05, 0x00]);
        assert_eq!(
            &Element::string("cn").to_bytes()[..],
            &[0x04, 0x02, b'c', b'n']
        );
    }

    #[test]
    fn test_sequence_encoding() {
        let seq = Element::sequence(vec![Element::integer(1), Element::string("a")]);
        assert_eq!(
            &seq.to_bytes()[..],
            &[0x30, 0x06, 0x02, 0x01, 0x01, 0x04, 0x01, b'a']
        );
        assert_eq!(seq.encoded_len(), 8);
    }

    #[test]
    fn test_long_content_uses_long_form() {
        let element = Element::octet_string(vec![0xAB; 200]);
        let bytes = element.to_bytes();
        assert_eq!(&bytes[..3], &[0x04, 0x81, 0xC8]);
        assert_eq!(bytes.len(), 203);
        assert_eq!(element.encoded_len(), 203);
    }

    #[test]
    fn test_implicit_keeps_form() {
        let tagged = Element::string("x").implicit(Identifier::context(7, true));
        assert_eq!(tagged.id(), Identifier::context(7, false));
        assert_eq!(&tagged.to_bytes()[..], &[0x87, 0x01, b'x']);

        let tagged = Element::sequence(vec![]).implicit(Identifier::application(2, false));
        assert!(tagged.id().is_constructed());
    }

    #[test]
    fn test_explicit_wraps() {
        let wrapped = Element::integer(1).explicit(Identifier::context(2, false));
        assert_eq!(&wrapped.to_bytes()[..], &[0xA2, 0x03, 0x02, 0x01, 0x01]);
    }

    #[test]
    fn test_accessors_ignore_tag() {
        let element = Element::primitive(Identifier::context(1, false), vec![0xFF]);
        assert!(element.to_bool().unwrap());
        assert_eq!(element.to_integer().unwrap(), -1);

        let element = Element::primitive(Identifier::application(2, false), "abc");
        assert_eq!(element.to_utf8().unwrap(), "abc");
    }

    #[test]
    fn test_shape_errors() {
        let seq = Element::sequence(vec![]);
        assert!(matches!(seq.as_octets(), Err(Error::NotPrimitive(_))));
        assert!(matches!(Element::null().children(), Err(Error::NotConstructed(_))));

        let err = Element::null()
            .expect_tag("test", Identifier::INTEGER)
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedTag { context: "test", .. }));
        assert!(!err.is_framing());
    }

    #[test]
    fn test_i32_range() {
        assert_eq!(Element::integer(7).to_i32().unwrap(), 7);
        assert!(Element::integer(i64::from(i32::MAX) + 1).to_i32().is_err());
    }

    #[test]
    fn test_invalid_utf8() {
        let element = Element::octet_string(vec![0xC3, 0x28]);
        assert!(matches!(element.to_utf8(), Err(Error::InvalidValue { .. })));
    }
}
