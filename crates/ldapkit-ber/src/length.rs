//! Definite-form length octets.

use bytes::{BufMut, BytesMut};

use crate::{Error, Result};

/// Largest number of subsequent octets accepted in the long form.
const MAX_LENGTH_OCTETS: usize = std::mem::size_of::<usize>();

/// Number of octets needed to encode `length`.
#[must_use]
pub const fn encoded_len(length: usize) -> usize {
    if length < 0x80 {
        return 1;
    }
    let mut n = length;
    let mut octets = 1;
    while n > 0 {
        octets += 1;
        n >>= 8;
    }
    octets
}

/// Writes `length` using the short form below 128 and the long form otherwise.
// octets never exceeds size_of::<usize>() and each shifted byte is truncated on purpose
#[allow(clippy::cast_possible_truncation)]
pub fn encode(length: usize, buf: &mut BytesMut) {
    if length < 0x80 {
        buf.put_u8(length as u8);
        return;
    }
    let octets = encoded_len(length) - 1;
    buf.put_u8(0x80 | octets as u8);
    for i in (0..octets).rev() {
        buf.put_u8((length >> (8 * i)) as u8);
    }
}

/// Reads length octets from the start of `input`.
///
/// Returns the declared content length and the number of octets consumed.
pub fn decode(input: &[u8], offset: usize) -> Result<(usize, usize)> {
    let Some(&first) = input.first() else {
        return Err(Error::Truncated {
            offset,
            needed: 1,
            available: 0,
        });
    };

    if first & 0x80 == 0 {
        return Ok((usize::from(first), 1));
    }

    let octets = usize::from(first & 0x7F);
    if octets == 0 {
        return Err(Error::IndefiniteLength(offset));
    }
    if first == 0xFF {
        return Err(Error::MalformedLength {
            offset,
            message: "reserved length octet 0xFF".to_string(),
        });
    }
    if octets > MAX_LENGTH_OCTETS {
        return Err(Error::MalformedLength {
            offset,
            message: format!("{octets} length octets exceed the supported {MAX_LENGTH_OCTETS}"),
        });
    }
    let Some(bytes) = input.get(1..=octets) else {
        return Err(Error::Truncated {
            offset,
            needed: octets + 1,
            available: input.len(),
        });
    };

    let length = bytes
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
    Ok((length, octets + 1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn to_vec(length: usize) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode(length, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn test_short_form() {
        assert_eq!(to_vec(0), vec![0x00]);
        assert_eq!(to_vec(127), vec![0x7F]);
        assert_eq!(decode(&[0x05], 0).unwrap(), (5, 1));
    }

    #[test]
    fn test_long_form() {
        assert_eq!(to_vec(128), vec![0x81, 0x80]);
        assert_eq!(to_vec(255), vec![0x81, 0xFF]);
        assert_eq!(to_vec(256), vec![0x82, 0x01, 0x00]);
        assert_eq!(to_vec(70000), vec![0x83, 0x01, 0x11, 0x70]);
        assert_eq!(decode(&[0x82, 0x01, 0x00], 0).unwrap(), (256, 3));
    }

    #[test]
    fn test_non_minimal_long_form_accepted() {
        assert_eq!(decode(&[0x82, 0x00, 0x05], 0).unwrap(), (5, 3));
    }

    #[test]
    fn test_indefinite_rejected() {
        assert_eq!(decode(&[0x80], 7), Err(Error::IndefiniteLength(7)));
    }

    #[test]
    fn test_reserved_octet_rejected() {
        assert!(matches!(
            decode(&[0xFF], 0),
            Err(Error::MalformedLength { .. })
        ));
    }

    #[test]
    fn test_truncated_long_form() {
        let err = decode(&[0x83, 0x01], 2).unwrap_err();
        assert_eq!(
            err,
            Error::Truncated {
                offset: 2,
                needed: 4,
                available: 2,
            }
        );
    }

    #[test]
    fn test_too_many_length_octets() {
        let mut input = vec![0x80 | 9];
        input.extend_from_slice(&[0x01; 9]);
        assert!(matches!(
            decode(&input, 0),
            Err(Error::MalformedLength { .. })
        ));
    }

    proptest! {
        #[test]
        fn length_roundtrips(length in 0usize..=u32::MAX as usize) {
            let bytes = to_vec(length);
            prop_assert_eq!(bytes.len(), encoded_len(length));
            prop_assert_eq!(decode(&bytes, 0).unwrap(), (length, bytes.len()));
        }
    }
}
