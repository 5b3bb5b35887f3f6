//! Extended operations.
//!
//! An [`ExtendedOperation`] is an OID with an optional opaque value. It turns
//! into an [`ExtendedRequest`] body for sending, and the name and value of an
//! [`ExtendedResponse`] can be read back into the same type.

use ldapkit_ber::Element;

use crate::message::{ExtendedRequest, ExtendedResponse, ProtocolOp};
use crate::{Error, Result};

/// OID of the request that counts the entries in a naming context.
pub const NAMING_CONTEXT_COUNT_OID: &str = "2.16.840.1.113719.1.27.100.13";

/// OID of the RFC 4532 "Who am I?" request.
pub const WHO_AM_I_OID: &str = "1.3.6.1.4.1.4203.1.11.3";

/// An extended operation identified by OID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedOperation {
    oid: String,
    value: Option<Vec<u8>>,
}

impl ExtendedOperation {
    /// Creates an operation. The OID must not be empty.
    pub fn new(oid: impl Into<String>, value: Option<Vec<u8>>) -> Result<Self> {
        let oid = oid.into();
        if oid.trim().is_empty() {
            return Err(Error::invalid_parameter("extended operation requires an OID"));
        }
        Ok(Self { oid, value })
    }

    /// Counts the entries of the naming context rooted at `dn`.
    ///
    /// The request value is the DN encoded as a BER OCTET STRING.
    pub fn naming_context_entry_count(dn: &str) -> Result<Self> {
        if dn.trim().is_empty() {
            return Err(Error::invalid_parameter(
                "naming context entry count requires a distinguished name",
            ));
        }
        Ok(Self {
            oid: NAMING_CONTEXT_COUNT_OID.to_string(),
            value: Some(Element::string(dn).to_bytes().to_vec()),
        })
    }

    /// Asks the server for the authorization identity of the connection.
    #[must_use]
    pub fn who_am_i() -> Self {
        Self {
            oid: WHO_AM_I_OID.to_string(),
            value: None,
        }
    }

    /// Reads the name and value of a response.
    ///
    /// Returns `None` when the server sent no response name.
    #[must_use]
    pub fn from_response(response: &ExtendedResponse) -> Option<Self> {
        response.name.as_ref().map(|oid| Self {
            oid: oid.clone(),
            value: response.value.clone(),
        })
    }

    /// Returns the OID.
    #[must_use]
    pub fn oid(&self) -> &str {
        &self.oid
    }

    /// Returns the value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// Builds the protocol operation to send.
    #[must_use]
    pub fn to_request(&self) -> ProtocolOp {
        ProtocolOp::ExtendedRequest(ExtendedRequest {
            name: self.oid.clone(),
            value: self.value.clone(),
        })
    }
}

impl From<ExtendedOperation> for ExtendedRequest {
    fn from(op: ExtendedOperation) -> Self {
        Self {
            name: op.oid,
            value: op.value,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::message::LdapResult;
    use crate::types::ResultCode;

    #[test]
    fn test_naming_context_count_value() {
        let op = ExtendedOperation::naming_context_entry_count("o=acme").unwrap();
        assert_eq!(op.oid(), NAMING_CONTEXT_COUNT_OID);
        assert_eq!(
            op.value().unwrap(),
            &[0x04, 0x06, b'o', b'=', b'a', b'c', b'm', b'e']
        );
    }

    #[test]
    fn test_naming_context_count_requires_dn() {
        assert!(matches!(
            ExtendedOperation::naming_context_entry_count(""),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_who_am_i_has_no_value() {
        let ProtocolOp::ExtendedRequest(request) = ExtendedOperation::who_am_i().to_request() else {
            panic!("expected extended request");
        };
        assert_eq!(request.name, WHO_AM_I_OID);
        assert!(request.value.is_none());
    }

    #[test]
    fn test_generic_operation() {
        assert!(ExtendedOperation::new(" ", None).is_err());
        let op = ExtendedOperation::new("1.2.3", Some(vec![1])).unwrap();
        let request: ExtendedRequest = op.clone().into();
        assert_eq!(request.name, "1.2.3");
        assert_eq!(request.value, Some(vec![1]));
    }

    #[test]
    fn test_from_response() {
        let mut response = ExtendedResponse {
            result: LdapResult::new(ResultCode::Success),
            name: None,
            value: Some(b"dn:cn=admin".to_vec()),
        };
        assert!(ExtendedOperation::from_response(&response).is_none());
        response.name = Some(WHO_AM_I_OID.to_string());
        let op = ExtendedOperation::from_response(&response).unwrap();
        assert_eq!(op.value(), Some(&b"dn:cn=admin"[..]));
    }
}
