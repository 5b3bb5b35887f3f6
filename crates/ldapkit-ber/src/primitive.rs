//! Content octets of the primitive universal types.

use std::fmt::Write as _;

use crate::{Error, Result};

/// Encodes a BOOLEAN. TRUE is written as 0xFF.
#[must_use]
pub fn encode_bool(value: bool) -> Vec<u8> {
    vec![if value { 0xFF } else { 0x00 }]
}

/// Decodes BOOLEAN content. Any non-zero octet is TRUE.
pub fn decode_bool(content: &[u8]) -> Result<bool> {
    match content {
        [b] => Ok(*b != 0),
        _ => Err(Error::invalid(
            "BOOLEAN",
            format!("content must be 1 octet, got {}", content.len()),
        )),
    }
}

/// Encodes an INTEGER or ENUMERATED in minimal two's complement form.
#[must_use]
pub fn encode_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    // Drop a leading octet while the next one still carries the sign.
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Decodes INTEGER or ENUMERATED content into an `i64`.
pub fn decode_integer(content: &[u8]) -> Result<i64> {
    if content.is_empty() {
        return Err(Error::invalid("INTEGER", "empty content"));
    }
    if content.len() > 8 {
        return Err(Error::invalid(
            "INTEGER",
            format!("{} octets do not fit in 64 bits", content.len()),
        ));
    }
    let negative = content[0] & 0x80 != 0;
    let init: i64 = if negative { -1 } else { 0 };
    Ok(content
        .iter()
        .fold(init, |acc, &b| (acc << 8) | i64::from(b)))
}

/// Encodes a dotted-decimal OBJECT IDENTIFIER.
pub fn encode_oid(dotted: &str) -> Result<Vec<u8>> {
    let arcs = dotted
        .split('.')
        .map(|arc| {
            arc.parse::<u64>().map_err(|_| {
                Error::invalid(
                    "OBJECT IDENTIFIER",
                    format!("bad arc {arc:?} in {dotted:?}"),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let [first, second, rest @ ..] = arcs.as_slice() else {
        return Err(Error::invalid(
            "OBJECT IDENTIFIER",
            format!("{dotted:?} needs at least two arcs"),
        ));
    };
    if *first > 2 || (*first < 2 && *second > 39) {
        return Err(Error::invalid(
            "OBJECT IDENTIFIER",
            format!("{dotted:?} has an invalid leading arc pair"),
        ));
    }

    let lead = first
        .checked_mul(40)
        .and_then(|v| v.checked_add(*second))
        .ok_or_else(|| {
            Error::invalid(
                "OBJECT IDENTIFIER",
                format!("{dotted:?} has a second arc too large to encode"),
            )
        })?;

    let mut out = Vec::new();
    push_base128(&mut out, lead);
    for arc in rest {
        push_base128(&mut out, *arc);
    }
    Ok(out)
}

// masked to seven bits before each cast
#[allow(clippy::cast_possible_truncation)]
fn push_base128(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        groups.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    out.extend(groups.iter().rev());
}

/// Decodes OBJECT IDENTIFIER content into dotted-decimal form.
pub fn decode_oid(content: &[u8]) -> Result<String> {
    if content.is_empty() {
        return Err(Error::invalid("OBJECT IDENTIFIER", "empty content"));
    }
    let mut arcs = Vec::new();
    let mut value: u64 = 0;
    let mut in_arc = false;
    for &b in content {
        if !in_arc && b == 0x80 {
            return Err(Error::invalid("OBJECT IDENTIFIER", "arc has a leading zero group"));
        }
        if value > (u64::MAX >> 7) {
            return Err(Error::invalid("OBJECT IDENTIFIER", "arc overflows 64 bits"));
        }
        value = (value << 7) | u64::from(b & 0x7F);
        in_arc = b & 0x80 != 0;
        if !in_arc {
            arcs.push(value);
            value = 0;
        }
    }
    if in_arc {
        return Err(Error::invalid("OBJECT IDENTIFIER", "last arc is not terminated"));
    }

    let mut dotted = String::new();
    let first = arcs[0];
    let (a, b) = match first {
        0..=39 => (0, first),
        40..=79 => (1, first - 40),
        _ => (2, first - 80),
    };
    let _ = write!(dotted, "{a}.{b}");
    for arc in &arcs[1..] {
        let _ = write!(dotted, ".{arc}");
    }
    Ok(dotted)
}
