//! # ldapkit-ber
//!
//! A reader and writer for the subset of ASN.1 Basic Encoding Rules used by
//! LDAPv3.
//!
//! ## Features
//!
//! - **Element tree**: every value is an [`Element`] carrying an
//!   [`Identifier`] and either primitive content octets or child elements
//! - **Definite lengths only**: encoding always uses the short form below 128
//!   and the minimal long form otherwise; the indefinite form is rejected
//! - **Limits for untrusted input**: [`DecoderConfig`] bounds nesting depth
//!   and declared lengths
//! - **Positional decoding**: [`SequenceReader`] resolves OPTIONAL and
//!   DEFAULT components by tag in declaration order
//!
//! ## Example
//!
//! ```
//! use ldapkit_ber::{Element, Identifier, decode_exact};
//!
//! let element = Element::sequence(vec![
//!     Element::integer(1),
//!     Element::string("cn=admin").implicit(Identifier::context(0, false)),
//! ]);
//! let bytes = element.to_bytes();
//! assert_eq!(decode_exact(&bytes).unwrap(), element);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod decoder;
mod element;
mod error;
mod identifier;
pub mod length;
pub mod primitive;
mod reader;

pub use decoder::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_LENGTH, DecoderConfig, decode, decode_exact};
pub use element::{Content, Element};
pub use error::{Error, Result};
pub use identifier::{Class, Identifier};
pub use reader::SequenceReader;
