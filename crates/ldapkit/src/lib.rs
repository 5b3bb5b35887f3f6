//! # ldapkit
//!
//! An LDAPv3 protocol engine: RFC 2251 messages on top of the
//! [`ldapkit_ber`] codec, an RFC 2254 search filter compiler, and a
//! multiplexer that routes responses to their requests by message id.
//!
//! ## Features
//!
//! - **Complete operation set**: bind, unbind, search, modify, add, delete,
//!   modify DN, compare, abandon, extended and intermediate responses; each
//!   body is built and decoded by the same type
//! - **Controls**: generic [`Control`]s attached to the message envelope, and
//!   a [`ControlRegistry`] that upgrades received controls to typed ones
//!   (paged results, server-side sort)
//! - **Filter compiler**: [`Filter::parse`] turns RFC 2254 text into the wire
//!   filter, and `Display` renders it back
//! - **Multiplexer**: any number of tasks wait on their own [`Listener`] while
//!   one [`Dispatcher`] feeds inbound messages; listeners can be merged
//! - **Transport agnostic**: works over any `AsyncRead`/`AsyncWrite` stream;
//!   connecting and TLS stay with the caller
//!
//! ## Quick Start
//!
//! ```ignore
//! use ldapkit::{
//!     Dispatcher, FramedStream, LdapMessage, MessageIdGenerator, Multiplexer, ProtocolOp,
//!     SearchRequest, SearchScope,
//! };
//!
//! #[tokio::main]
//! async fn main() -> ldapkit::Result<()> {
//!     let stream = tokio::net::TcpStream::connect("ldap.example.com:389").await?;
//!     let (read, write) = tokio::io::split(stream);
//!
//!     let mux = Multiplexer::new();
//!     let dispatcher = Dispatcher::new(mux.clone());
//!     tokio::spawn(async move { dispatcher.run(FramedStream::new(read)).await });
//!
//!     let ids = MessageIdGenerator::new();
//!     let listener = mux.listener();
//!     let mut writer = FramedStream::new(write);
//!
//!     let id = ids.next();
//!     listener.register(id)?;
//!     let search =
//!         SearchRequest::new("dc=example,dc=com", SearchScope::WholeSubtree, "(cn=Bob*)")?;
//!     writer
//!         .write_message(&LdapMessage::new(id, ProtocolOp::SearchRequest(search)))
//!         .await?;
//!
//!     loop {
//!         let response = listener.get_response_for(id).await?;
//!         if let ProtocolOp::SearchResultEntry(entry) = response.op() {
//!             println!("{}", entry.object_name);
//!         }
//!         if response.is_terminal() {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Filters
//!
//! ```
//! use ldapkit::Filter;
//!
//! let filter = Filter::parse("(&(objectClass=person)(cn=J*n))").unwrap();
//! assert_eq!(filter.to_string(), "(&(objectClass=person)(cn=J*n))");
//! ```
//!
//! ## Modules
//!
//! - [`connection`]: Framed I/O, configuration and the dispatch loop
//! - [`control`]: Controls, typed controls and the control registry
//! - [`extensions`]: Extended operations
//! - [`filter`]: RFC 2254 filter compiler and the wire filter
//! - [`message`]: The message envelope and every protocol operation
//! - [`multiplexer`]: Routing of responses to listeners
//! - [`types`]: Message ids, result codes and small enumerations

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod connection;
pub mod control;
mod error;
pub mod extensions;
pub mod filter;
pub mod message;
pub mod multiplexer;
pub mod types;

pub use connection::{Config, ConfigBuilder, Dispatcher, FramedStream};
pub use control::{
    Control, ControlFactory, ControlRegistry, Controls, DecodeControl, PagedResults,
    ResponseControl, SortKey, SortRequest, SortResponse,
};
pub use error::{Error, Result};
pub use extensions::ExtendedOperation;
pub use filter::Filter;
pub use message::{
    AddRequest, Attribute, BindRequest, BindResponse, CompareRequest, Constraints, LdapMessage,
    LdapResult, ModifyDnRequest, ModifyRequest, Modification, ProtocolOp, ReceivedMessage,
    SearchRequest, SearchResultEntry,
};
pub use multiplexer::{Delivery, EntryState, Listener, Multiplexer};
pub use types::{
    DerefAliases, MessageId, MessageIdGenerator, ModifyOperation, ResultCode, SearchScope,
};
