//! Core LDAP types.
//!
//! Message identifiers, result codes and the small enumerations used by
//! request bodies, following RFC 2251.

mod identifiers;
mod result_code;
mod search;

pub use identifiers::{MessageId, MessageIdGenerator};
pub use result_code::ResultCode;
pub use search::{DerefAliases, ModifyOperation, SearchScope};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_codes() {
        for scope in [
            SearchScope::BaseObject,
            SearchScope::SingleLevel,
            SearchScope::WholeSubtree,
        ] {
            assert_eq!(SearchScope::from_code(scope.code()).unwrap(), scope);
        }
        assert!(SearchScope::from_code(3).is_err());
        assert_eq!(SearchScope::default(), SearchScope::WholeSubtree);
    }

    #[test]
    fn test_deref_codes() {
        assert_eq!(DerefAliases::from_code(3).unwrap(), DerefAliases::Always);
        assert_eq!(DerefAliases::FindingBaseObject.code(), 2);
        assert!(DerefAliases::from_code(-1).is_err());
    }

    #[test]
    fn test_modify_operation_codes() {
        assert_eq!(
            ModifyOperation::from_code(2).unwrap(),
            ModifyOperation::Replace
        );
        assert_eq!(ModifyOperation::Delete.code(), 1);
        assert!(ModifyOperation::from_code(9).is_err());
    }
}
