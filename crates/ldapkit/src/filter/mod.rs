//! Search filters.
//!
//! [`Filter::parse`] compiles RFC 2254 text into the `Filter` CHOICE of
//! RFC 2251; [`Filter::to_element`] and [`Filter::from_element`] convert
//! between that tree and its BER form; `Display` renders canonical text.
//!
//! ```text
//! Filter ::= CHOICE {
//!     and             [0] SET OF Filter,
//!     or              [1] SET OF Filter,
//!     not             [2] Filter,
//!     equalityMatch   [3] AttributeValueAssertion,
//!     substrings      [4] SubstringFilter,
//!     greaterOrEqual  [5] AttributeValueAssertion,
//!     lessOrEqual     [6] AttributeValueAssertion,
//!     present         [7] AttributeDescription,
//!     approxMatch     [8] AttributeValueAssertion,
//!     extensibleMatch [9] MatchingRuleAssertion }
//! ```

mod escape;
mod lexer;
mod parser;

use std::fmt;
use std::str::FromStr;

use ldapkit_ber::{Element, Identifier, SequenceReader};

use crate::{Error, Result};

pub use escape::{escape, unescape};

const AND: u32 = 0;
const OR: u32 = 1;
const NOT: u32 = 2;
const EQUALITY: u32 = 3;
const SUBSTRINGS: u32 = 4;
const GREATER_OR_EQUAL: u32 = 5;
const LESS_OR_EQUAL: u32 = 6;
const PRESENT: u32 = 7;
const APPROX: u32 = 8;
const EXTENSIBLE: u32 = 9;

const SUBSTRING_INITIAL: Identifier = Identifier::context(0, false);
const SUBSTRING_ANY: Identifier = Identifier::context(1, false);
const SUBSTRING_FINAL: Identifier = Identifier::context(2, false);

const MATCHING_RULE: Identifier = Identifier::context(1, false);
const MATCH_TYPE: Identifier = Identifier::context(2, false);
const MATCH_VALUE: Identifier = Identifier::context(3, false);
const DN_ATTRIBUTES: Identifier = Identifier::context(4, false);

/// An attribute description paired with an asserted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValueAssertion {
    /// Attribute description.
    pub attribute: String,
    /// Asserted value, escapes already decoded.
    pub value: Vec<u8>,
}

/// Substring assertion.
///
/// On the wire the parts always appear as initial, then any, then final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstringFilter {
    /// Attribute description.
    pub attribute: String,
    /// Leading part.
    pub initial: Option<Vec<u8>>,
    /// Interior parts, in order.
    pub any: Vec<Vec<u8>>,
    /// Trailing part.
    pub final_: Option<Vec<u8>>,
}

/// Extensible match assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingRuleAssertion {
    /// Matching rule OID.
    pub matching_rule: Option<String>,
    /// Attribute description.
    pub attribute: Option<String>,
    /// Asserted value.
    pub value: Vec<u8>,
    /// Also match attributes of the entry's DN.
    pub dn_attributes: bool,
}

/// A search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// All children must match.
    And(Vec<Filter>),
    /// At least one child must match.
    Or(Vec<Filter>),
    /// The child must not match.
    Not(Box<Filter>),
    /// `attr=value`
    Equality(AttributeValueAssertion),
    /// `attr=ini*any*fin`
    Substrings(SubstringFilter),
    /// `attr>=value`
    GreaterOrEqual(AttributeValueAssertion),
    /// `attr<=value`
    LessOrEqual(AttributeValueAssertion),
    /// `attr=*`
    Present(String),
    /// `attr~=value`
    ApproxMatch(AttributeValueAssertion),
    /// `attr:dn:rule:=value`
    Extensible(MatchingRuleAssertion),
}

impl Filter {
    /// Compiles RFC 2254 filter text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilterSyntax`] for any malformed input. No partial
    /// filter is ever returned.
    pub fn parse(text: &str) -> Result<Self> {
        parser::parse(text)
    }

    /// Equality filter on UTF-8 text.
    #[must_use]
    pub fn equality(attribute: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::Equality(AttributeValueAssertion {
            attribute: attribute.into(),
            value: value.into(),
        })
    }

    /// Presence filter.
    #[must_use]
    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Present(attribute.into())
    }

    /// Builds the wire form.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let tag = |n| Identifier::context(n, true);
        match self {
            Self::And(children) => {
                Element::constructed(tag(AND), children.iter().map(Self::to_element).collect())
            }
            Self::Or(children) => {
                Element::constructed(tag(OR), children.iter().map(Self::to_element).collect())
            }
            Self::Not(inner) => inner.to_element().explicit(tag(NOT)),
            Self::Equality(ava) => ava.to_element(tag(EQUALITY)),
            Self::GreaterOrEqual(ava) => ava.to_element(tag(GREATER_OR_EQUAL)),
            Self::LessOrEqual(ava) => ava.to_element(tag(LESS_OR_EQUAL)),
            Self::ApproxMatch(ava) => ava.to_element(tag(APPROX)),
            Self::Present(attribute) => {
                Element::primitive(Identifier::context(PRESENT, false), attribute.as_bytes())
            }
            Self::Substrings(sub) => {
                let mut parts = Vec::with_capacity(sub.any.len() + 2);
                if let Some(initial) = &sub.initial {
                    parts.push(Element::primitive(SUBSTRING_INITIAL, initial.clone()));
                }
                for any in &sub.any {
                    parts.push(Element::primitive(SUBSTRING_ANY, any.clone()));
                }
                if let Some(final_) = &sub.final_ {
                    parts.push(Element::primitive(SUBSTRING_FINAL, final_.clone()));
                }
                Element::constructed(
                    tag(SUBSTRINGS),
                    vec![Element::string(&sub.attribute), Element::sequence(parts)],
                )
            }
            Self::Extensible(mra) => {
                let mut children = Vec::with_capacity(4);
                if let Some(rule) = &mra.matching_rule {
                    children.push(Element::string(rule).implicit(MATCHING_RULE));
                }
                if let Some(attribute) = &mra.attribute {
                    children.push(Element::string(attribute).implicit(MATCH_TYPE));
                }
                children.push(Element::primitive(MATCH_VALUE, mra.value.clone()));
                if mra.dn_attributes {
                    children.push(Element::boolean(true).implicit(DN_ATTRIBUTES));
                }
                Element::constructed(tag(EXTENSIBLE), children)
            }
        }
    }

    /// Reads the wire form.
    pub fn from_element(element: Element) -> Result<Self> {
        let id = element.id();
        if id.class() != ldapkit_ber::Class::Context {
            return Err(Error::decode("Filter", format!("unexpected tag {id}")));
        }
        match id.number() {
            AND => Ok(Self::And(filter_set("and", element)?)),
            OR => Ok(Self::Or(filter_set("or", element)?)),
            NOT => {
                let mut reader = SequenceReader::new("Filter.not", element)?;
                let inner = reader.next_any("filter")?;
                reader.finish()?;
                Ok(Self::Not(Box::new(Self::from_element(inner)?)))
            }
            EQUALITY => AttributeValueAssertion::from_element(element).map(Self::Equality),
            GREATER_OR_EQUAL => {
                AttributeValueAssertion::from_element(element).map(Self::GreaterOrEqual)
            }
            LESS_OR_EQUAL => AttributeValueAssertion::from_element(element).map(Self::LessOrEqual),
            APPROX => AttributeValueAssertion::from_element(element).map(Self::ApproxMatch),
            PRESENT => Ok(Self::Present(element.to_utf8()?)),
            SUBSTRINGS => SubstringFilter::from_element(element).map(Self::Substrings),
            EXTENSIBLE => MatchingRuleAssertion::from_element(element).map(Self::Extensible),
            other => Err(Error::decode("Filter", format!("unknown filter choice [{other}]"))),
        }
    }
}

fn filter_set(context: &'static str, element: Element) -> Result<Vec<Filter>> {
    let children = element.into_children()?;
    if children.is_empty() {
        return Err(Error::decode("Filter", format!("{context} has no filters")));
    }
    children.into_iter().map(Filter::from_element).collect()
}

impl AttributeValueAssertion {
    fn to_element(&self, tag: Identifier) -> Element {
        Element::constructed(
            tag,
            vec![
                Element::string(&self.attribute),
                Element::octet_string(self.value.clone()),
            ],
        )
    }

    fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("AttributeValueAssertion", element)?;
        let attribute = reader
            .next(Identifier::OCTET_STRING, "attributeDesc")?
            .to_utf8()?;
        let value = reader
            .next(Identifier::OCTET_STRING, "assertionValue")?
            .into_octets()?;
        reader.finish()?;
        Ok(Self { attribute, value })
    }
}

impl SubstringFilter {
    fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("SubstringFilter", element)?;
        let attribute = reader.next(Identifier::OCTET_STRING, "type")?.to_utf8()?;
        let parts = reader.next(Identifier::SEQUENCE, "substrings")?;
        reader.finish()?;

        let mut filter = Self {
            attribute,
            initial: None,
            any: Vec::new(),
            final_: None,
        };
        let parts = parts.into_children()?;
        let count = parts.len();
        for (index, part) in parts.into_iter().enumerate() {
            let id = part.id();
            let bytes = part.into_octets()?;
            if id.same_tag(SUBSTRING_INITIAL) && index == 0 {
                filter.initial = Some(bytes);
            } else if id.same_tag(SUBSTRING_ANY) && filter.final_.is_none() {
                filter.any.push(bytes);
            } else if id.same_tag(SUBSTRING_FINAL) && index + 1 == count {
                filter.final_ = Some(bytes);
            } else {
                return Err(Error::decode(
                    "SubstringFilter",
                    format!("{id} out of order at position {index}"),
                ));
            }
        }
        if count == 0 {
            return Err(Error::decode("SubstringFilter", "no substrings"));
        }
        Ok(filter)
    }
}

impl MatchingRuleAssertion {
    fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("MatchingRuleAssertion", element)?;
        let matching_rule = reader
            .optional(MATCHING_RULE)
            .map(|e| e.to_utf8())
            .transpose()?;
        let attribute = reader
            .optional(MATCH_TYPE)
            .map(|e| e.to_utf8())
            .transpose()?;
        let value = reader.next(MATCH_VALUE, "matchValue")?.into_octets()?;
        let dn_attributes = reader.bool_or(DN_ATTRIBUTES, false)?;
        reader.finish()?;
        Ok(Self {
            matching_rule,
            attribute,
            value,
            dn_attributes,
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(children) | Self::Or(children) => {
                let open = match self {
                    Self::And(_) => "(&",
                    _ => "(|",
                };
                f.write_str(open)?;
                for child in children {
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
            Self::Not(inner) => write!(f, "(!{inner})"),
            Self::Equality(ava) => write!(f, "({}={})", ava.attribute, escape(&ava.value)),
            Self::GreaterOrEqual(ava) => write!(f, "({}>={})", ava.attribute, escape(&ava.value)),
            Self::LessOrEqual(ava) => write!(f, "({}<={})", ava.attribute, escape(&ava.value)),
            Self::ApproxMatch(ava) => write!(f, "({}~={})", ava.attribute, escape(&ava.value)),
            Self::Present(attribute) => write!(f, "({attribute}=*)"),
            Self::Substrings(sub) => {
                write!(f, "({}=", sub.attribute)?;
                if let Some(initial) = &sub.initial {
                    f.write_str(&escape(initial))?;
                }
                for any in &sub.any {
                    write!(f, "*{}", escape(any))?;
                }
                f.write_str("*")?;
                if let Some(final_) = &sub.final_ {
                    f.write_str(&escape(final_))?;
                }
                f.write_str(")")
            }
            Self::Extensible(mra) => {
                f.write_str("(")?;
                if let Some(attribute) = &mra.attribute {
                    f.write_str(attribute)?;
                }
                if mra.dn_attributes {
                    f.write_str(":dn")?;
                }
                if let Some(rule) = &mra.matching_rule {
                    write!(f, ":{rule}")?;
                }
                write!(f, ":={})", escape(&mra.value))
            }
        }
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
