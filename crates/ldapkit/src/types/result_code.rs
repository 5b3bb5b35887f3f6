//! LDAP result codes.

macro_rules! result_codes {
    ($($(#[$doc:meta])* $name:ident = $code:literal,)*) => {
        /// Result code of an `LDAPResult`.
        ///
        /// Codes not listed here are preserved in [`ResultCode::Unknown`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum ResultCode {
            $($(#[$doc])* $name,)*
            /// A code this library has no name for.
            Unknown(i32),
        }

        impl ResultCode {
            /// Maps a wire value to a result code.
            #[must_use]
            pub const fn from_code(code: i32) -> Self {
                match code {
                    $($code => Self::$name,)*
                    other => Self::Unknown(other),
                }
            }

            /// Returns the wire value.
            #[must_use]
            pub const fn code(self) -> i32 {
                match self {
                    $(Self::$name => $code,)*
                    Self::Unknown(code) => code,
                }
            }
        }
    };
}

result_codes! {
    /// success
    Success = 0,
    /// operationsError
    OperationsError = 1,
    /// protocolError
    ProtocolError = 2,
    /// timeLimitExceeded
    TimeLimitExceeded = 3,
    /// sizeLimitExceeded
    SizeLimitExceeded = 4,
    /// compareFalse
    CompareFalse = 5,
    /// compareTrue
    CompareTrue = 6,
    /// authMethodNotSupported
    AuthMethodNotSupported = 7,
    /// strongAuthRequired
    StrongAuthRequired = 8,
    /// referral
    Referral = 10,
    /// adminLimitExceeded
    AdminLimitExceeded = 11,
    /// unavailableCriticalExtension
    UnavailableCriticalExtension = 12,
    /// confidentialityRequired
    ConfidentialityRequired = 13,
    /// saslBindInProgress
    SaslBindInProgress = 14,
    /// noSuchAttribute
    NoSuchAttribute = 16,
    /// undefinedAttributeType
    UndefinedAttributeType = 17,
    /// inappropriateMatching
    InappropriateMatching = 18,
    /// constraintViolation
    ConstraintViolation = 19,
    /// attributeOrValueExists
    AttributeOrValueExists = 20,
    /// invalidAttributeSyntax
    InvalidAttributeSyntax = 21,
    /// noSuchObject
    NoSuchObject = 32,
    /// aliasProblem
    AliasProblem = 33,
    /// invalidDNSyntax
    InvalidDnSyntax = 34,
    /// aliasDereferencingProblem
    AliasDereferencingProblem = 36,
    /// inappropriateAuthentication
    InappropriateAuthentication = 48,
    /// invalidCredentials
    InvalidCredentials = 49,
    /// insufficientAccessRights
    InsufficientAccessRights = 50,
    /// busy
    Busy = 51,
    /// unavailable
    Unavailable = 52,
    /// unwillingToPerform
    UnwillingToPerform = 53,
    /// loopDetect
    LoopDetect = 54,
    /// namingViolation
    NamingViolation = 64,
    /// objectClassViolation
    ObjectClassViolation = 65,
    /// notAllowedOnNonLeaf
    NotAllowedOnNonLeaf = 66,
    /// notAllowedOnRDN
    NotAllowedOnRdn = 67,
    /// entryAlreadyExists
    EntryAlreadyExists = 68,
    /// objectClassModsProhibited
    ObjectClassModsProhibited = 69,
    /// affectsMultipleDSAs
    AffectsMultipleDsas = 71,
    /// other
    Other = 80,
}

impl ResultCode {
    /// Returns `true` for `success`, `compareFalse` and `compareTrue`.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::CompareFalse | Self::CompareTrue)
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown ({code})"),
            known => write!(f, "{known:?} ({})", known.code()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(ResultCode::from_code(0), ResultCode::Success);
        assert_eq!(ResultCode::from_code(49), ResultCode::InvalidCredentials);
        assert_eq!(ResultCode::NoSuchObject.code(), 32);
        assert!(ResultCode::CompareTrue.is_success());
        assert!(!ResultCode::Busy.is_success());
    }

    #[test]
    fn test_unknown_preserved() {
        let code = ResultCode::from_code(4096);
        assert_eq!(code, ResultCode::Unknown(4096));
        assert_eq!(code.code(), 4096);
        assert_eq!(code.to_string(), "unknown (4096)");
    }

    #[test]
    fn test_display() {
        assert_eq!(ResultCode::Referral.to_string(), "Referral (10)");
    }
}
