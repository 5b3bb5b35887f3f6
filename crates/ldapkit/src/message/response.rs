//! Response bodies.

use ldapkit_ber::{Element, Identifier, SequenceReader};

use super::attribute::{Attribute, attribute_list, read_attribute_list, read_strings, strings};
use crate::Result;
use crate::types::ResultCode;

const REFERRAL: Identifier = Identifier::context(3, true);
const SERVER_SASL_CREDS: Identifier = Identifier::context(7, false);
const RESPONSE_NAME: Identifier = Identifier::context(10, false);
const RESPONSE_VALUE: Identifier = Identifier::context(11, false);
const INTERMEDIATE_NAME: Identifier = Identifier::context(0, false);
const INTERMEDIATE_VALUE: Identifier = Identifier::context(1, false);

/// Outcome shared by every response that completes an operation.
///
/// ```text
/// LDAPResult ::= SEQUENCE {
///     resultCode         ENUMERATED,
///     matchedDN          LDAPDN,
///     errorMessage       LDAPString,
///     referral           [3] Referral OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapResult {
    /// Result code.
    pub code: ResultCode,
    /// Name of the last entry matched while resolving the target DN.
    pub matched_dn: String,
    /// Diagnostic message from the server.
    pub diagnostic_message: String,
    /// Referral URLs, present when `code` is `referral`.
    pub referrals: Vec<String>,
}

impl LdapResult {
    /// Creates a result with no matched DN, message or referrals.
    #[must_use]
    pub const fn new(code: ResultCode) -> Self {
        Self {
            code,
            matched_dn: String::new(),
            diagnostic_message: String::new(),
            referrals: Vec::new(),
        }
    }

    /// Sets the diagnostic message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.diagnostic_message = message.into();
        self
    }

    /// Returns `true` for a successful outcome.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Appends the result components to a response SEQUENCE.
    pub(crate) fn push_elements(&self, children: &mut Vec<Element>) {
        children.push(Element::enumerated(i64::from(self.code.code())));
        children.push(Element::string(&self.matched_dn));
        children.push(Element::string(&self.diagnostic_message));
        if !self.referrals.is_empty() {
            children.push(strings(&self.referrals).implicit(REFERRAL));
        }
    }

    /// Reads the result components from the front of a response SEQUENCE.
    pub(crate) fn read(reader: &mut SequenceReader) -> Result<Self> {
        let code = reader.next(Identifier::ENUMERATED, "resultCode")?.to_i32()?;
        let code = ResultCode::from_code(code);
        let matched_dn = reader
            .next(Identifier::OCTET_STRING, "matchedDN")?
            .to_utf8()?;
        let diagnostic_message = reader
            .next(Identifier::OCTET_STRING, "errorMessage")?
            .to_utf8()?;
        let referrals = match reader.optional(REFERRAL) {
            Some(list) => read_strings("LDAPResult.referral", list)?,
            None => Vec::new(),
        };
        Ok(Self {
            code,
            matched_dn,
            diagnostic_message,
            referrals,
        })
    }

    pub(crate) fn to_element(&self, tag: Identifier) -> Element {
        let mut children = Vec::with_capacity(4);
        self.push_elements(&mut children);
        Element::constructed(tag, children)
    }

    pub(crate) fn from_element(context: &'static str, element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new(context, element)?;
        let result = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(result)
    }
}

/// Bind response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindResponse {
    /// Outcome.
    pub result: LdapResult,
    /// SASL challenge or final credentials.
    pub server_sasl_creds: Option<Vec<u8>>,
}

impl BindResponse {
    pub(crate) fn to_element(&self, tag: Identifier) -> Element {
        let mut children = Vec::with_capacity(5);
        self.result.push_elements(&mut children);
        if let Some(creds) = &self.server_sasl_creds {
            children.push(Element::primitive(SERVER_SASL_CREDS, creds.clone()));
        }
        Element::constructed(tag, children)
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("BindResponse", element)?;
        let result = LdapResult::read(&mut reader)?;
        let server_sasl_creds = reader
            .optional(SERVER_SASL_CREDS)
            .map(Element::into_octets)
            .transpose()?;
        reader.finish()?;
        Ok(Self {
            result,
            server_sasl_creds,
        })
    }
}

/// One entry returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultEntry {
    /// DN of the entry.
    pub object_name: String,
    /// Returned attributes; values are empty for types-only searches.
    pub attributes: Vec<Attribute>,
}

impl SearchResultEntry {
    /// Returns the first attribute with the given name, ignoring ASCII case.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn to_element(&self, tag: Identifier) -> Element {
        Element::constructed(
            tag,
            vec![
                Element::string(&self.object_name),
                attribute_list(&self.attributes),
            ],
        )
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("SearchResultEntry", element)?;
        let object_name = reader
            .next(Identifier::OCTET_STRING, "objectName")?
            .to_utf8()?;
        let attributes = read_attribute_list(
            "PartialAttribute",
            reader.next(Identifier::SEQUENCE, "attributes")?,
        )?;
        reader.finish()?;
        Ok(Self {
            object_name,
            attributes,
        })
    }
}

/// Extended response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedResponse {
    /// Outcome.
    pub result: LdapResult,
    /// Response OID.
    pub name: Option<String>,
    /// Response value.
    pub value: Option<Vec<u8>>,
}

impl ExtendedResponse {
    pub(crate) fn to_element(&self, tag: Identifier) -> Element {
        let mut children = Vec::with_capacity(6);
        self.result.push_elements(&mut children);
        if let Some(name) = &self.name {
            children.push(Element::string(name).implicit(RESPONSE_NAME));
        }
        if let Some(value) = &self.value {
            children.push(Element::primitive(RESPONSE_VALUE, value.clone()));
        }
        Element::constructed(tag, children)
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("ExtendedResponse", element)?;
        let result = LdapResult::read(&mut reader)?;
        let name = reader
            .optional(RESPONSE_NAME)
            .map(|e| e.to_utf8())
            .transpose()?;
        let value = reader
            .optional(RESPONSE_VALUE)
            .map(Element::into_octets)
            .transpose()?;
        reader.finish()?;
        Ok(Self {
            result,
            name,
            value,
        })
    }
}

/// Intermediate response (RFC 4511).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateResponse {
    /// Response OID.
    pub name: Option<String>,
    /// Response value.
    pub value: Option<Vec<u8>>,
}

impl IntermediateResponse {
    pub(crate) fn to_element(&self, tag: Identifier) -> Element {
        let mut children = Vec::with_capacity(2);
        if let Some(name) = &self.name {
            children.push(Element::string(name).implicit(INTERMEDIATE_NAME));
        }
        if let Some(value) = &self.value {
            children.push(Element::primitive(INTERMEDIATE_VALUE, value.clone()));
        }
        Element::constructed(tag, children)
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("IntermediateResponse", element)?;
        let name = reader
            .optional(INTERMEDIATE_NAME)
            .map(|e| e.to_utf8())
            .transpose()?;
        let value = reader
            .optional(INTERMEDIATE_VALUE)
            .map(Element::into_octets)
            .transpose()?;
        reader.finish()?;
        Ok(Self { name, value })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TAG: Identifier = Identifier::application(5, true);

    #[test]
    fn test_result_wire() {
        let result = LdapResult::new(ResultCode::Success);
        assert_eq!(
            &result.to_element(TAG).to_bytes()[..],
            &[0x65, 0x07, 0x0A, 0x01, 0x00, 0x04, 0x00, 0x04, 0x00]
        );
    }

    #[test]
    fn test_result_with_referrals() {
        let mut result = LdapResult::new(ResultCode::Referral).with_message("go elsewhere");
        result.referrals = vec!["ldap://a/".to_string(), "ldap://b/".to_string()];
        let decoded = LdapResult::from_element("test", result.to_element(TAG)).unwrap();
        assert_eq!(decoded, result);
        assert!(!decoded.is_success());
    }

    #[test]
    fn test_result_missing_field() {
        let element = Element::constructed(
            TAG,
            vec![Element::enumerated(0), Element::string("")],
        );
        let err = LdapResult::from_element("SearchResultDone", element).unwrap_err();
        assert!(err.to_string().contains("errorMessage"), "{err}");
    }

    #[test]
    fn test_unknown_code_kept() {
        let element = Element::constructed(
            TAG,
            vec![
                Element::enumerated(118),
                Element::string(""),
                Element::string(""),
            ],
        );
        let decoded = LdapResult::from_element("test", element).unwrap();
        assert_eq!(decoded.code, ResultCode::Unknown(118));
    }

    #[test]
    fn test_bind_response_creds() {
        let response = BindResponse {
            result: LdapResult::new(ResultCode::SaslBindInProgress),
            server_sasl_creds: Some(b"challenge".to_vec()),
        };
        let decoded = BindResponse::from_element(response.to_element(TAG)).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_entry_attribute_lookup() {
        let entry = SearchResultEntry {
            object_name: "cn=a".to_string(),
            attributes: vec![Attribute::new("mail", ["a@x", "b@x"])],
        };
        let decoded = SearchResultEntry::from_element(entry.to_element(TAG)).unwrap();
        assert_eq!(decoded, entry);
        let mail: Vec<_> = decoded.attribute("MAIL").unwrap().str_values().collect();
        assert_eq!(mail, vec!["a@x", "b@x"]);
    }

    #[test]
    fn test_extended_response_optional_fields() {
        let response = ExtendedResponse {
            result: LdapResult::new(ResultCode::Success),
            name: None,
            value: Some(b"dn:cn=a".to_vec()),
        };
        let decoded = ExtendedResponse::from_element(response.to_element(TAG)).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_intermediate_empty() {
        let response = IntermediateResponse {
            name: None,
            value: None,
        };
        assert_eq!(
            IntermediateResponse::from_element(response.to_element(TAG)).unwrap(),
            response
        );
    }
}
