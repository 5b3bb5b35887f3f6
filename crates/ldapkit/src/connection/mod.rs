//! Transport boundary.
//!
//! This module moves complete LDAP messages over an existing byte stream:
//! - Configuration (message size and nesting limits)
//! - Framed I/O that reads and writes one BER message at a time
//! - The inbound dispatch loop feeding a [`crate::Multiplexer`]
//!
//! Opening sockets and negotiating TLS are left to the caller.

mod config;
mod dispatcher;
mod framed;

pub use config::{Config, ConfigBuilder, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_READ_BUFFER_SIZE};
pub use dispatcher::Dispatcher;
pub use framed::FramedStream;
