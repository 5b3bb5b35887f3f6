//! Recursive-descent parser for RFC 2254 filter strings.
//!
//! ```text
//! filter     = "(" filtercomp ")"
//! filtercomp = and / or / not / item
//! and        = "&" filterlist
//! or         = "|" filterlist
//! not        = "!" filter
//! filterlist = 1*filter
//! item       = simple / present / substring / extensible
//! ```

use super::escape::unescape;
use super::lexer::{Lexer, Operator, RawValue};
use super::{AttributeValueAssertion, Filter, MatchingRuleAssertion, SubstringFilter};
use crate::{Error, Result};

/// Parses filter text.
///
/// Text without an outer parenthesis is wrapped in one, so `cn=Bob` and
/// `(cn=Bob)` are equivalent.
pub fn parse(text: &str) -> Result<Filter> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::FilterSyntax {
            position: 0,
            message: "empty filter".to_string(),
        });
    }

    let leading = text.len() - text.trim_start().len();
    if trimmed.starts_with('(') {
        parse_complete(trimmed).map_err(|e| shift(e, leading, 0))
    } else {
        parse_complete(&format!("({trimmed})")).map_err(|e| shift(e, leading, 1))
    }
}

/// Maps an error position back to the caller's text.
fn shift(error: Error, leading: usize, wrapped: usize) -> Error {
    match error {
        Error::FilterSyntax { position, message } => Error::FilterSyntax {
            position: (position + leading).saturating_sub(wrapped),
            message,
        },
        other => other,
    }
}

fn parse_complete(text: &str) -> Result<Filter> {
    let mut lexer = Lexer::new(text.as_bytes());
    let filter = parse_filter(&mut lexer)?;
    if !lexer.is_eof() {
        return Err(lexer.error("unexpected input after filter"));
    }
    Ok(filter)
}

fn parse_filter(lexer: &mut Lexer<'_>) -> Result<Filter> {
    lexer.expect(b'(')?;
    let filter = parse_component(lexer)?;
    lexer.expect(b')')?;
    Ok(filter)
}

fn parse_component(lexer: &mut Lexer<'_>) -> Result<Filter> {
    match lexer.peek() {
        Some(b'&') => {
            lexer.bump();
            parse_list(lexer, '&').map(Filter::And)
        }
        Some(b'|') => {
            lexer.bump();
            parse_list(lexer, '|').map(Filter::Or)
        }
        Some(b'!') => {
            lexer.bump();
            parse_filter(lexer).map(|inner| Filter::Not(Box::new(inner)))
        }
        Some(b')') => Err(lexer.error("empty filter")),
        None => Err(lexer.error("unexpected end of input")),
        Some(_) => parse_item(lexer),
    }
}

fn parse_list(lexer: &mut Lexer<'_>, op: char) -> Result<Vec<Filter>> {
    let mut filters = Vec::new();
    while lexer.peek() == Some(b'(') {
        filters.push(parse_filter(lexer)?);
    }
    if filters.is_empty() {
        return Err(lexer.error(format!("'{op}' requires at least one filter")));
    }
    Ok(filters)
}

fn parse_item(lexer: &mut Lexer<'_>) -> Result<Filter> {
    let (attribute, start) = lexer.read_description(false);
    if lexer.peek() == Some(b':') {
        return parse_extensible(lexer, attribute, start);
    }
    if attribute.is_empty() {
        return Err(Error::FilterSyntax {
            position: start,
            message: "missing attribute description".to_string(),
        });
    }

    let operator = lexer.read_operator()?;
    let value = lexer.read_value()?;
    let attribute = attribute.to_string();
    match operator {
        Operator::Equal => equality_item(attribute, value),
        Operator::Approx => Ok(Filter::ApproxMatch(ava(attribute, value)?)),
        Operator::GreaterOrEqual => Ok(Filter::GreaterOrEqual(ava(attribute, value)?)),
        Operator::LessOrEqual => Ok(Filter::LessOrEqual(ava(attribute, value)?)),
    }
}

fn ava(attribute: String, value: RawValue<'_>) -> Result<AttributeValueAssertion> {
    Ok(AttributeValueAssertion {
        attribute,
        value: unescape(value.bytes, value.position)?,
    })
}

/// Builds an equality, presence or substrings filter from an `=` item.
fn equality_item(attribute: String, value: RawValue<'_>) -> Result<Filter> {
    if value.bytes == b"*" {
        return Ok(Filter::Present(attribute));
    }

    let segments = split_unescaped_stars(value.bytes);
    if segments.len() == 1 {
        return Ok(Filter::Equality(ava(attribute, value)?));
    }

    let decode = |(offset, bytes): (usize, &[u8])| -> Result<Option<Vec<u8>>> {
        if bytes.is_empty() {
            Ok(None)
        } else {
            unescape(bytes, value.position + offset).map(Some)
        }
    };

    let last = segments.len() - 1;
    let mut initial = None;
    let mut any = Vec::new();
    let mut final_ = None;
    for (index, segment) in segments.into_iter().enumerate() {
        let Some(bytes) = decode(segment)? else {
            continue;
        };
        if index == 0 {
            initial = Some(bytes);
        } else if index == last {
            final_ = Some(bytes);
        } else {
            any.push(bytes);
        }
    }

    if initial.is_none() && any.is_empty() && final_.is_none() {
        return Err(Error::FilterSyntax {
            position: value.position,
            message: "substring filter has no value".to_string(),
        });
    }

    Ok(Filter::Substrings(SubstringFilter {
        attribute,
        initial,
        any,
        final_,
    }))
}

/// Splits a raw value on `*` characters that are not escaped.
///
/// Returns each segment with its offset inside `raw`.
fn split_unescaped_stars(raw: &[u8]) -> Vec<(usize, &[u8])> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'\\' => i += 2,
            b'*' => {
                segments.push((start, &raw[start..i]));
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    segments.push((start, &raw[start.min(raw.len())..]));
    segments
}

/// Parses `attr[:dn][:rule]:=value` and `[:dn]:rule:=value`.
fn parse_extensible(lexer: &mut Lexer<'_>, attribute: &str, start: usize) -> Result<Filter> {
    let (rest, _) = lexer.read_description(true);
    let operator = lexer.read_operator()?;
    let stripped = rest.strip_suffix(':');
    let (Some(rest), Operator::Equal) = (stripped, operator) else {
        return Err(Error::FilterSyntax {
            position: start,
            message: "extensible match requires ':='".to_string(),
        });
    };

    let mut dn_attributes = false;
    let mut matching_rule = None;
    // `rest` starts at the first ':' so the leading part is empty.
    for part in rest.split(':').skip(1) {
        let part = part.trim();
        if part.eq_ignore_ascii_case("dn") && !dn_attributes && matching_rule.is_none() {
            dn_attributes = true;
        } else if !part.is_empty() && matching_rule.is_none() {
            matching_rule = Some(part.to_string());
        } else {
            return Err(Error::FilterSyntax {
                position: start,
                message: format!("invalid extensible match component '{part}'"),
            });
        }
    }

    let attribute = (!attribute.is_empty()).then(|| attribute.to_string());
    if attribute.is_none() && matching_rule.is_none() {
        return Err(Error::FilterSyntax {
            position: start,
            message: "extensible match needs an attribute or a matching rule".to_string(),
        });
    }

    let value = lexer.read_value()?;
    Ok(Filter::Extensible(MatchingRuleAssertion {
        matching_rule,
        attribute,
        value: unescape(value.bytes, value.position)?,
        dn_attributes,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn eq(attribute: &str, value: &[u8]) -> Filter {
        Filter::Equality(AttributeValueAssertion {
            attribute: attribute.to_string(),
            value: value.to_vec(),
        })
    }

    fn substrings(initial: Option<&str>, any: &[&str], final_: Option<&str>) -> Filter {
        Filter::Substrings(SubstringFilter {
            attribute: "cn".to_string(),
            initial: initial.map(|s| s.as_bytes().to_vec()),
            any: any.iter().map(|s| s.as_bytes().to_vec()).collect(),
            final_: final_.map(|s| s.as_bytes().to_vec()),
        })
    }

    fn syntax_error(text: &str) -> bool {
        matches!(parse(text), Err(Error::FilterSyntax { .. }))
    }

    #[test]
    fn test_equality() {
        assert_eq!(parse("(cn=Bob)").unwrap(), eq("cn", b"Bob"));
    }

    #[test]
    fn test_present() {
        assert_eq!(parse("(cn=*)").unwrap(), Filter::Present("cn".to_string()));
    }

    #[test]
    fn test_substrings_initial_final() {
        assert_eq!(
            parse("(cn=B*b)").unwrap(),
            substrings(Some("B"), &[], Some("b"))
        );
    }

    #[test]
    fn test_substrings_final_only() {
        assert_eq!(
            parse("(cn=*ob)").unwrap(),
            substrings(None, &[], Some("ob"))
        );
    }

    #[test]
    fn test_substrings_all_parts() {
        assert_eq!(
            parse("(cn=a*b*c*d)").unwrap(),
            substrings(Some("a"), &["b", "c"], Some("d"))
        );
        assert_eq!(parse("(cn=*b*)").unwrap(), substrings(None, &["b"], None));
        assert_eq!(parse("(cn=a*)").unwrap(), substrings(Some("a"), &[], None));
        assert_eq!(
            parse("(cn=a**b)").unwrap(),
            substrings(Some("a"), &[], Some("b"))
        );
    }

    #[test]
    fn test_escaped_star_is_equality() {
        assert_eq!(parse("(cn=Bob\\2a)").unwrap(), eq("cn", b"Bob*"));
        assert_eq!(parse("(cn=Bob\\*)").unwrap(), eq("cn", b"Bob*"));
    }

    #[test]
    fn test_escapes_decoded_per_segment() {
        assert_eq!(
            parse("(cn=\\2a*\\28x\\29)").unwrap(),
            substrings(Some("*"), &[], Some("(x)"))
        );
    }

    #[test]
    fn test_and_preserves_order() {
        let filter = parse("(&(cn=Bob)(sn=Smith))").unwrap();
        assert_eq!(
            filter,
            Filter::And(vec![eq("cn", b"Bob"), eq("sn", b"Smith")])
        );
    }

    #[test]
    fn test_or_and_nesting() {
        let filter = parse("(|(cn=a)(&(sn=b)(!(uid=c))))").unwrap();
        let Filter::Or(children) = filter else {
            unreachable!("expected OR");
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(&children[1], Filter::And(inner) if inner.len() == 2));
    }

    #[test]
    fn test_not() {
        assert_eq!(
            parse("(!(cn=Bob))").unwrap(),
            Filter::Not(Box::new(eq("cn", b"Bob")))
        );
    }

    #[test]
    fn test_relational_operators() {
        assert!(matches!(parse("(age>=21)").unwrap(), Filter::GreaterOrEqual(_)));
        assert!(matches!(parse("(age<=65)").unwrap(), Filter::LessOrEqual(_)));
        assert!(matches!(parse("(cn~=Bob)").unwrap(), Filter::ApproxMatch(_)));
    }

    #[test]
    fn test_star_is_literal_in_ordering_match() {
        let Filter::GreaterOrEqual(ava) = parse("(cn>=a*)").unwrap() else {
            unreachable!("expected >=");
        };
        assert_eq!(ava.value, b"a*");
    }

    #[test]
    fn test_missing_outer_parens_are_added() {
        assert_eq!(parse("cn=Bob").unwrap(), eq("cn", b"Bob"));
        assert_eq!(parse("  cn = Bob ").unwrap(), eq("cn", b"Bob"));
    }

    #[test]
    fn test_whitespace_between_components() {
        let filter = parse("( & (cn=a) (sn=b) )").unwrap();
        assert!(matches!(filter, Filter::And(children) if children.len() == 2));
    }

    #[test]
    fn test_extensible() {
        let filter = parse("(cn:dn:2.5.13.5:=John)").unwrap();
        assert_eq!(
            filter,
            Filter::Extensible(MatchingRuleAssertion {
                matching_rule: Some("2.5.13.5".to_string()),
                attribute: Some("cn".to_string()),
                value: b"John".to_vec(),
                dn_attributes: true,
            })
        );

        let Filter::Extensible(mra) = parse("(:1.2.3:=x)").unwrap() else {
            unreachable!("expected extensible");
        };
        assert_eq!(mra.attribute, None);
        assert_eq!(mra.matching_rule.as_deref(), Some("1.2.3"));
        assert!(!mra.dn_attributes);

        let Filter::Extensible(mra) = parse("(o:dn:=Ace)").unwrap() else {
            unreachable!("expected extensible");
        };
        assert!(mra.dn_attributes);
        assert_eq!(mra.matching_rule, None);
    }

    #[test]
    fn test_extensible_errors() {
        assert!(syntax_error("(:=x)"));
        assert!(syntax_error("(:dn:=x)"));
        assert!(syntax_error("(cn:1.2:1.3:=x)"));
        assert!(syntax_error("(cn:dn=x)"));
    }

    #[test]
    fn test_malformed_filters() {
        assert!(syntax_error("(cn=Bob"));
        assert!(syntax_error("()"));
        assert!(syntax_error("(&)"));
        assert!(syntax_error("(|)"));
        assert!(syntax_error("(!)"));
        assert!(syntax_error(""));
        assert!(syntax_error("   "));
        assert!(syntax_error("(=Bob)"));
        assert!(syntax_error("(cn<Bob)"));
        assert!(syntax_error("(cn)"));
        assert!(syntax_error("(cn=Bob))"));
        assert!(syntax_error("(cn=Bob)(sn=x)"));
        assert!(syntax_error("(cn=**)"));
        assert!(syntax_error("(cn=a\\zz)"));
        assert!(syntax_error("(cn=a(b)"));
        assert!(syntax_error("(&(cn=a)"));
    }

    #[test]
    fn test_error_positions() {
        let Err(Error::FilterSyntax { position, .. }) = parse("(cn=a\\zz)") else {
            unreachable!("expected syntax error");
        };
        assert_eq!(position, 5);

        let Err(Error::FilterSyntax { position, .. }) = parse("cn=a\\zz") else {
            unreachable!("expected syntax error");
        };
        assert_eq!(position, 4);
    }
}
