//! Identifier octets: tag class, constructed flag and tag number.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::{Error, Result};

/// Tag class, stored in the top two bits of the first identifier octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// Types defined by X.680 itself.
    Universal,
    /// Application-wide types (the LDAP operation tags).
    Application,
    /// Context-specific tags inside a SEQUENCE or CHOICE.
    Context,
    /// Private-use tags.
    Private,
}

impl Class {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Universal,
            1 => Self::Application,
            2 => Self::Context,
            _ => Self::Private,
        }
    }

    const fn bits(self) -> u8 {
        match self {
            Self::Universal => 0x00,
            Self::Application => 0x40,
            Self::Context => 0x80,
            Self::Private => 0xC0,
        }
    }
}

/// Identifier of a BER element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier {
    class: Class,
    constructed: bool,
    number: u32,
}

/// Tag numbers at or above this value use the multi-octet form.
const HIGH_TAG_NUMBER: u32 = 0x1F;

impl Identifier {
    /// BOOLEAN.
    pub const BOOLEAN: Self = Self::new(Class::Universal, false, 1);
    /// INTEGER.
    pub const INTEGER: Self = Self::new(Class::Universal, false, 2);
    /// OCTET STRING (primitive form).
    pub const OCTET_STRING: Self = Self::new(Class::Universal, false, 4);
    /// NULL.
    pub const NULL: Self = Self::new(Class::Universal, false, 5);
    /// OBJECT IDENTIFIER.
    pub const OBJECT_IDENTIFIER: Self = Self::new(Class::Universal, false, 6);
    /// ENUMERATED.
    pub const ENUMERATED: Self = Self::new(Class::Universal, false, 10);
    /// SEQUENCE and SEQUENCE OF.
    pub const SEQUENCE: Self = Self::new(Class::Universal, true, 16);
    /// SET and SET OF.
    pub const SET: Self = Self::new(Class::Universal, true, 17);

    /// Creates an identifier.
    #[must_use]
    pub const fn new(class: Class, constructed: bool, number: u32) -> Self {
        Self {
            class,
            constructed,
            number,
        }
    }

    /// Creates an APPLICATION identifier.
    #[must_use]
    pub const fn application(number: u32, constructed: bool) -> Self {
        Self::new(Class::Application, constructed, number)
    }

    /// Creates a context-specific identifier.
    #[must_use]
    pub const fn context(number: u32, constructed: bool) -> Self {
        Self::new(Class::Context, constructed, number)
    }

    /// Returns the tag class.
    #[must_use]
    pub const fn class(self) -> Class {
        self.class
    }

    /// Returns `true` for the constructed encoding.
    #[must_use]
    pub const fn is_constructed(self) -> bool {
        self.constructed
    }

    /// Returns the tag number.
    #[must_use]
    pub const fn number(self) -> u32 {
        self.number
    }

    /// Returns the same tag with the given encoding form.
    #[must_use]
    pub const fn with_constructed(self, constructed: bool) -> Self {
        Self::new(self.class, constructed, self.number)
    }

    /// Returns `true` if class and number match, ignoring the encoding form.
    #[must_use]
    pub fn same_tag(self, other: Self) -> bool {
        self.class == other.class && self.number == other.number
    }

    /// Number of octets the identifier occupies on the wire.
    #[must_use]
    pub const fn encoded_len(self) -> usize {
        if self.number < HIGH_TAG_NUMBER {
            return 1;
        }
        let mut n = self.number;
        let mut octets = 1;
        while n > 0 {
            octets += 1;
            n >>= 7;
        }
        octets
    }

    /// Writes the identifier octets.
    // every cast below is of a value already below 0x80
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(self, buf: &mut BytesMut) {
        let lead = self.class.bits() | if self.constructed { 0x20 } else { 0x00 };
        if self.number < HIGH_TAG_NUMBER {
            buf.put_u8(lead | self.number as u8);
            return;
        }
        buf.put_u8(lead | 0x1F);
        let groups = self.encoded_len() - 1;
        for i in (0..groups).rev() {
            let group = ((self.number >> (7 * i)) & 0x7F) as u8;
            buf.put_u8(if i == 0 { group } else { group | 0x80 });
        }
    }

    /// Reads identifier octets from the start of `input`.
    ///
    /// Returns the identifier and the number of octets consumed. `offset` is
    /// only used to annotate errors.
    pub fn decode(input: &[u8], offset: usize) -> Result<(Self, usize)> {
        let Some(&first) = input.first() else {
            return Err(Error::Truncated {
                offset,
                needed: 1,
                available: 0,
            });
        };
        let class = Class::from_bits(first >> 6);
        let constructed = first & 0x20 != 0;
        let low = u32::from(first & 0x1F);
        if low < HIGH_TAG_NUMBER {
            return Ok((Self::new(class, constructed, low), 1));
        }

        let mut number: u32 = 0;
        let mut pos = 1;
        loop {
            let Some(&octet) = input.get(pos) else {
                return Err(Error::Truncated {
                    offset,
                    needed: pos + 1,
                    available: input.len(),
                });
            };
            if pos == 1 && octet == 0x80 {
                return Err(Error::MalformedIdentifier {
                    offset,
                    message: "high tag number has a leading zero group".to_string(),
                });
            }
            if number > (u32::MAX >> 7) {
                return Err(Error::TagNumberOverflow(offset));
            }
            number = (number << 7) | u32::from(octet & 0x7F);
            pos += 1;
            if octet & 0x80 == 0 {
                break;
            }
        }
        Ok((Self::new(class, constructed, number), pos))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            Class::Universal => "UNIVERSAL",
            Class::Application => "APPLICATION",
            Class::Context => "CONTEXT",
            Class::Private => "PRIVATE",
        };
        let form = if self.constructed {
            "constructed"
        } else {
            "primitive"
        };
        write!(f, "[{class} {}] {form}", self.number)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::needless_collect,
    clippy::unreadable_literal
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode(id: Identifier) -> Vec<u8> {
        let mut buf = BytesMut::new();
        id.encode(&mut buf);
        buf.to_vec()
    }

    #[test]
    fn test_low_tag_numbers() {
        assert_eq!(encode(Identifier::SEQUENCE), vec![0x30]);
        assert_eq!(encode(Identifier::INTEGER), vec![0x02]);
        assert_eq!(encode(Identifier::application(0, true)), vec![0x60]);
        assert_eq!(encode(Identifier::application(2, false)), vec![0x42]);
        assert_eq!(encode(Identifier::context(0, true)), vec![0xA0]);
        assert_eq!(encode(Identifier::context(7, false)), vec![0x87]);
    }

    #[test]
    fn test_high_tag_number_form() {
        let id = Identifier::context(31, false);
        assert_eq!(encode(id), vec![0x9F, 0x1F]);
        assert_eq!(id.encoded_len(), 2);

        let id = Identifier::application(201, true);
        assert_eq!(encode(id), vec![0x7F, 0x81, 0x49]);
        assert_eq!(Identifier::decode(&[0x7F, 0x81, 0x49], 0).unwrap(), (id, 3));
    }

    #[test]
    fn test_decode_class_and_form() {
        let (id, used) = Identifier::decode(&[0xE3], 0).unwrap();
        assert_eq!(used, 1);
        assert_eq!(id.class(), Class::Private);
        assert!(id.is_constructed());
        assert_eq!(id.number(), 3);
    }

    #[test]
    fn test_decode_unterminated_high_tag() {
        let err = Identifier::decode(&[0x1F, 0x81], 4).unwrap_err();
        assert_eq!(
            err,
            Error::Truncated {
                offset: 4,
                needed: 3,
                available: 2,
            }
        );
        assert!(err.is_framing());
    }

    #[test]
    fn test_decode_leading_zero_group() {
        let err = Identifier::decode(&[0x1F, 0x80, 0x01], 0).unwrap_err();
        assert!(matches!(err, Error::MalformedIdentifier { .. }));
    }

    #[test]
    fn test_decode_overflow() {
        let err = Identifier::decode(&[0x1F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F], 0)
            .unwrap_err();
        assert_eq!(err, Error::TagNumberOverflow(0));
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(
            Identifier::decode(&[], 0),
            Err(Error::Truncated { needed: 1, .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Identifier::application(3, true).to_string(),
            "[APPLICATION 3] constructed"
        );
    }

    proptest! {
        #[test]
        fn identifier_roundtrips(
            class in 0u8..4,
            constructed in any::<bool>(),
            number in any::<u32>(),
        ) {
            let id = Identifier::new(Class::from_bits(class), constructed, number);
            let bytes = encode(id);
            prop_assert_eq!(bytes.len(), id.encoded_len());
            prop_assert_eq!(Identifier::decode(&bytes, 0).unwrap(), (id, bytes.len()));
        }
    }
}
