//! Error types for the LDAP library.

use std::time::Duration;

use thiserror::Error;

use crate::types::MessageId;

/// Errors that can occur while encoding, decoding or routing LDAP messages.
#[derive(Debug, Error)]
pub enum Error {
    /// BER framing or shape error reported by the codec.
    #[error("BER error: {0}")]
    Ber(#[from] ldapkit_ber::Error),

    /// A well-framed message does not match the protocol grammar.
    #[error("Decode error in {context}: {message}")]
    Decode {
        /// Protocol element being decoded.
        context: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// Filter text could not be compiled.
    #[error("Filter syntax error at position {position}: {message}")]
    FilterSyntax {
        /// Character position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// The identifier completed and every queued message has been read.
    #[error("No more results for message {0}")]
    NoMoreResults(MessageId),

    /// The listener has no outstanding message identifiers.
    #[error("Listener has no outstanding requests")]
    ListenerIdle,

    /// The identifier was abandoned while a caller was waiting on it.
    #[error("Message {0} was abandoned")]
    Abandoned(MessageId),

    /// The identifier is not registered with this listener.
    #[error("Message {0} is not outstanding on this listener")]
    NotOutstanding(MessageId),

    /// The identifier is already registered and still open.
    #[error("Message {0} is already registered")]
    AlreadyRegistered(MessageId),

    /// The connection was shut down.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A builder was given an argument it cannot encode.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A bounded wait expired.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// An inbound message exceeds the configured size limit.
    #[error("Message of {size} bytes exceeds limit of {max} bytes")]
    MessageTooLarge {
        /// Declared size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn decode(context: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            context,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
