//! Server-side sorting controls (RFC 2891).

use std::any::Any;

use ldapkit_ber::{Element, Identifier, SequenceReader, decode_exact};

use super::{Control, DecodeControl, ResponseControl};
use crate::types::ResultCode;
use crate::{Error, Result};

const ORDERING_RULE: Identifier = Identifier::context(0, false);
const REVERSE_ORDER: Identifier = Identifier::context(1, false);
const ATTRIBUTE_TYPE: Identifier = Identifier::context(0, false);

/// One key of a sort request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Attribute to sort on.
    pub attribute: String,
    /// Matching rule OID to order by, if not the attribute's default.
    pub ordering_rule: Option<String>,
    /// Sort in descending order.
    pub reverse: bool,
}

impl SortKey {
    /// Ascending key on `attribute` with its default ordering rule.
    #[must_use]
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            ordering_rule: None,
            reverse: false,
        }
    }

    /// Sets descending order.
    #[must_use]
    pub const fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Sets the ordering rule.
    #[must_use]
    pub fn with_ordering_rule(mut self, rule: impl Into<String>) -> Self {
        self.ordering_rule = Some(rule.into());
        self
    }

    fn to_element(&self) -> Element {
        let mut children = vec![Element::string(&self.attribute)];
        if let Some(rule) = &self.ordering_rule {
            children.push(Element::string(rule).implicit(ORDERING_RULE));
        }
        // reverseOrder is DEFAULT FALSE
        if self.reverse {
            children.push(Element::boolean(true).implicit(REVERSE_ORDER));
        }
        Element::sequence(children)
    }

    fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("SortKey", element)?;
        let attribute = reader
            .next(Identifier::OCTET_STRING, "attributeType")?
            .to_utf8()?;
        let ordering_rule = reader
            .optional(ORDERING_RULE)
            .map(|e| e.to_utf8())
            .transpose()?;
        let reverse = reader.bool_or(REVERSE_ORDER, false)?;
        reader.finish()?;
        Ok(Self {
            attribute,
            ordering_rule,
            reverse,
        })
    }
}

/// Sort request control.
///
/// ```text
/// SortKeyList ::= SEQUENCE OF SEQUENCE {
///     attributeType   AttributeDescription,
///     orderingRule    [0] MatchingRuleId OPTIONAL,
///     reverseOrder    [1] BOOLEAN DEFAULT FALSE }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortRequest {
    keys: Vec<SortKey>,
    control: Control,
}

impl SortRequest {
    /// Creates the control. At least one key is required.
    pub fn new(keys: Vec<SortKey>, critical: bool) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::invalid_parameter("sort request needs at least one key"));
        }
        if keys.iter().any(|k| k.attribute.is_empty()) {
            return Err(Error::invalid_parameter("sort key attribute must not be empty"));
        }
        let value = Element::sequence(keys.iter().map(SortKey::to_element).collect());
        Ok(Self {
            control: Control::new(Self::OID, critical, Some(value.to_bytes().to_vec())),
            keys,
        })
    }

    /// Sort keys in priority order.
    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }
}

impl ResponseControl for SortRequest {
    fn control(&self) -> &Control {
        &self.control
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeControl for SortRequest {
    const OID: &'static str = "1.2.840.113556.1.4.473";

    fn from_control(control: &Control) -> Result<Self> {
        let value = control
            .value()
            .ok_or_else(|| Error::decode("SortRequest", "control has no value"))?;
        let list = decode_exact(value)?;
        list.expect_tag("SortKeyList", Identifier::SEQUENCE)?;
        let keys = list
            .into_children()?
            .into_iter()
            .map(SortKey::from_element)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            keys,
            control: control.clone(),
        })
    }
}

impl From<SortRequest> for Control {
    fn from(sort: SortRequest) -> Self {
        sort.control
    }
}

/// Sort response control.
///
/// ```text
/// SortResult ::= SEQUENCE {
///     sortResult     ENUMERATED,
///     attributeType  [0] AttributeDescription OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortResponse {
    result: ResultCode,
    attribute: Option<String>,
    control: Control,
}

impl SortResponse {
    /// Creates the control.
    #[must_use]
    pub fn new(result: ResultCode, attribute: Option<String>) -> Self {
        let mut children = vec![Element::enumerated(i64::from(result.code()))];
        if let Some(attribute) = &attribute {
            children.push(Element::string(attribute).implicit(ATTRIBUTE_TYPE));
        }
        let value = Element::sequence(children).to_bytes().to_vec();
        Self {
            result,
            attribute,
            control: Control::new(Self::OID, false, Some(value)),
        }
    }

    /// Outcome of the sort.
    #[must_use]
    pub const fn result(&self) -> ResultCode {
        self.result
    }

    /// Attribute that caused the failure, if reported.
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }
}

impl ResponseControl for SortResponse {
    fn control(&self) -> &Control {
        &self.control
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeControl for SortResponse {
    const OID: &'static str = "1.2.840.113556.1.4.474";

    fn from_control(control: &Control) -> Result<Self> {
        let value = control
            .value()
            .ok_or_else(|| Error::decode("SortResponse", "control has no value"))?;
        let mut reader = SequenceReader::new("SortResponse", decode_exact(value)?)?;
        let result = ResultCode::from_code(
            reader.next(Identifier::ENUMERATED, "sortResult")?.to_i32()?,
        );
        let attribute = reader
            .optional(ATTRIBUTE_TYPE)
            .map(|e| e.to_utf8())
            .transpose()?;
        reader.finish()?;
        Ok(Self {
            result,
            attribute,
            control: control.clone(),
        })
    }
}

impl From<SortResponse> for Control {
    fn from(sort: SortResponse) -> Self {
        sort.control
    }
}
