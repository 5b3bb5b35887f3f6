//! Attributes and value assertions shared by several operations.

use ldapkit_ber::{Element, Identifier, SequenceReader};

use crate::Result;

/// An attribute description with its values, in the order given.
///
/// ```text
/// Attribute ::= SEQUENCE {
///     type  AttributeDescription,
///     vals  SET OF AttributeValue }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute description.
    pub name: String,
    /// Values, in order.
    pub values: Vec<Vec<u8>>,
}

impl Attribute {
    /// Creates an attribute from any list of byte-like values.
    #[must_use]
    pub fn new<V: Into<Vec<u8>>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the values that are valid UTF-8.
    pub fn str_values(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter_map(|v| std::str::from_utf8(v).ok())
    }

    pub(crate) fn to_element(&self) -> Element {
        let values = self.values.iter().cloned().map(Element::octet_string);
        Element::sequence(vec![
            Element::string(&self.name),
            Element::set(values.collect()),
        ])
    }

    pub(crate) fn from_element(context: &'static str, element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new(context, element)?;
        let name = reader.next(Identifier::OCTET_STRING, "type")?.to_utf8()?;
        let values = reader
            .next(Identifier::SET, "vals")?
            .into_children()?
            .into_iter()
            .map(|v| {
                v.expect_tag(context, Identifier::OCTET_STRING)?;
                v.into_octets()
            })
            .collect::<ldapkit_ber::Result<Vec<_>>>()?;
        reader.finish()?;
        Ok(Self { name, values })
    }
}

/// Encodes a list of attributes as `SEQUENCE OF Attribute`.
pub(crate) fn attribute_list(attributes: &[Attribute]) -> Element {
    Element::sequence(attributes.iter().map(Attribute::to_element).collect())
}

/// Decodes a `SEQUENCE OF Attribute`.
pub(crate) fn read_attribute_list(
    context: &'static str,
    element: Element,
) -> Result<Vec<Attribute>> {
    element
        .into_children()?
        .into_iter()
        .map(|e| Attribute::from_element(context, e))
        .collect()
}

/// Reads a `SEQUENCE OF LDAPString` such as an attribute selection or a
/// referral list.
pub(crate) fn read_strings(context: &'static str, element: Element) -> Result<Vec<String>> {
    element
        .into_children()?
        .into_iter()
        .map(|e| {
            e.expect_tag(context, Identifier::OCTET_STRING)?;
            Ok(e.to_utf8()?)
        })
        .collect()
}

/// Encodes a `SEQUENCE OF LDAPString`.
pub(crate) fn strings(values: &[String]) -> Element {
    Element::sequence(values.iter().map(|s| Element::string(s)).collect())
}
