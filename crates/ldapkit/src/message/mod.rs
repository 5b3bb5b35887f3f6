//! The `LDAPMessage` envelope and protocol operations.
//!
//! ```text
//! LDAPMessage ::= SEQUENCE {
//!     messageID   MessageID,
//!     protocolOp  CHOICE { bindRequest BindRequest, ... },
//!     controls    [0] Controls OPTIONAL }
//! ```
//!
//! Controls belong to the envelope. A message built without controls
//! encodes no `controls` field at all, and an empty list is treated the
//! same as no list.

mod attribute;
mod request;
mod response;
mod tags;

use std::time::Duration;

use bytes::Bytes;
use ldapkit_ber::{Class, DecoderConfig, Element, Identifier, SequenceReader};

use crate::control::{CONTROLS_TAG, Control, ControlRegistry, Controls, ResponseControl, downcast};
use crate::types::MessageId;
use crate::{Error, Result};

pub use attribute::Attribute;
pub use request::{
    AddRequest, Authentication, BindRequest, CompareRequest, ExtendedRequest, LDAP_VERSION,
    ModifyDnRequest, ModifyRequest, Modification, SearchRequest,
};
pub use response::{
    BindResponse, ExtendedResponse, IntermediateResponse, LdapResult, SearchResultEntry,
};

/// Body of an `LDAPMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolOp {
    /// Bind request.
    BindRequest(BindRequest),
    /// Bind response.
    BindResponse(BindResponse),
    /// Unbind request.
    UnbindRequest,
    /// Search request.
    SearchRequest(SearchRequest),
    /// One search result entry.
    SearchResultEntry(SearchResultEntry),
    /// End of a search.
    SearchResultDone(LdapResult),
    /// Continuation references of a search.
    SearchResultReference(Vec<String>),
    /// Modify request.
    ModifyRequest(ModifyRequest),
    /// Modify response.
    ModifyResponse(LdapResult),
    /// Add request.
    AddRequest(AddRequest),
    /// Add response.
    AddResponse(LdapResult),
    /// Delete request carrying the DN to remove.
    DelRequest(String),
    /// Delete response.
    DelResponse(LdapResult),
    /// Modify DN request.
    ModifyDnRequest(ModifyDnRequest),
    /// Modify DN response.
    ModifyDnResponse(LdapResult),
    /// Compare request.
    CompareRequest(CompareRequest),
    /// Compare response.
    CompareResponse(LdapResult),
    /// Abandon request carrying the id of the operation to abandon.
    AbandonRequest(MessageId),
    /// Extended request.
    ExtendedRequest(ExtendedRequest),
    /// Extended response.
    ExtendedResponse(ExtendedResponse),
    /// Intermediate response.
    IntermediateResponse(IntermediateResponse),
}

impl ProtocolOp {
    /// Delete request, rejecting an empty DN.
    pub fn delete(dn: impl Into<String>) -> Result<Self> {
        let dn = dn.into();
        if dn.trim().is_empty() {
            return Err(Error::invalid_parameter("delete requires a distinguished name"));
        }
        Ok(Self::DelRequest(dn))
    }

    /// Returns `false` for the responses that may be followed by more
    /// responses with the same id: search entries, search references and
    /// intermediate responses. Every other response ends its operation.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::SearchResultEntry(_)
                | Self::SearchResultReference(_)
                | Self::IntermediateResponse(_)
        )
    }

    /// Returns `true` for the operations a client sends.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        matches!(
            self,
            Self::BindRequest(_)
                | Self::UnbindRequest
                | Self::SearchRequest(_)
                | Self::ModifyRequest(_)
                | Self::AddRequest(_)
                | Self::DelRequest(_)
                | Self::ModifyDnRequest(_)
                | Self::CompareRequest(_)
                | Self::AbandonRequest(_)
                | Self::ExtendedRequest(_)
        )
    }

    /// Returns the operation's ASN.1 name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BindRequest(_) => "bindRequest",
            Self::BindResponse(_) => "bindResponse",
            Self::UnbindRequest => "unbindRequest",
            Self::SearchRequest(_) => "searchRequest",
            Self::SearchResultEntry(_) => "searchResEntry",
            Self::SearchResultDone(_) => "searchResDone",
            Self::SearchResultReference(_) => "searchResRef",
            Self::ModifyRequest(_) => "modifyRequest",
            Self::ModifyResponse(_) => "modifyResponse",
            Self::AddRequest(_) => "addRequest",
            Self::AddResponse(_) => "addResponse",
            Self::DelRequest(_) => "delRequest",
            Self::DelResponse(_) => "delResponse",
            Self::ModifyDnRequest(_) => "modDNRequest",
            Self::ModifyDnResponse(_) => "modDNResponse",
            Self::CompareRequest(_) => "compareRequest",
            Self::CompareResponse(_) => "compareResponse",
            Self::AbandonRequest(_) => "abandonRequest",
            Self::ExtendedRequest(_) => "extendedReq",
            Self::ExtendedResponse(_) => "extendedResp",
            Self::IntermediateResponse(_) => "intermediateResponse",
        }
    }

    /// Returns the `LDAPResult` of a response that carries one.
    #[must_use]
    pub const fn result(&self) -> Option<&LdapResult> {
        match self {
            Self::BindResponse(r) => Some(&r.result),
            Self::ExtendedResponse(r) => Some(&r.result),
            Self::SearchResultDone(r)
            | Self::ModifyResponse(r)
            | Self::AddResponse(r)
            | Self::DelResponse(r)
            | Self::ModifyDnResponse(r)
            | Self::CompareResponse(r) => Some(r),
            _ => None,
        }
    }

    /// Builds the APPLICATION-tagged wire form.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let app = |n| Identifier::application(n, true);
        match self {
            Self::BindRequest(op) => op.to_element(),
            Self::BindResponse(op) => op.to_element(app(tags::BIND_RESPONSE)),
            Self::UnbindRequest => Element::null().implicit(app(tags::UNBIND_REQUEST)),
            Self::SearchRequest(op) => op.to_element(),
            Self::SearchResultEntry(op) => op.to_element(app(tags::SEARCH_RESULT_ENTRY)),
            Self::SearchResultDone(r) => r.to_element(app(tags::SEARCH_RESULT_DONE)),
            Self::SearchResultReference(urls) => Element::constructed(
                app(tags::SEARCH_RESULT_REFERENCE),
                urls.iter().map(|u| Element::string(u)).collect(),
            ),
            Self::ModifyRequest(op) => op.to_element(),
            Self::ModifyResponse(r) => r.to_element(app(tags::MODIFY_RESPONSE)),
            Self::AddRequest(op) => op.to_element(),
            Self::AddResponse(r) => r.to_element(app(tags::ADD_RESPONSE)),
            Self::DelRequest(dn) => Element::string(dn).implicit(app(tags::DEL_REQUEST)),
            Self::DelResponse(r) => r.to_element(app(tags::DEL_RESPONSE)),
            Self::ModifyDnRequest(op) => op.to_element(),
            Self::ModifyDnResponse(r) => r.to_element(app(tags::MODIFY_DN_RESPONSE)),
            Self::CompareRequest(op) => op.to_element(),
            Self::CompareResponse(r) => r.to_element(app(tags::COMPARE_RESPONSE)),
            Self::AbandonRequest(id) => {
                Element::integer(i64::from(id.get())).implicit(app(tags::ABANDON_REQUEST))
            }
            Self::ExtendedRequest(op) => op.to_element(),
            Self::ExtendedResponse(op) => op.to_element(app(tags::EXTENDED_RESPONSE)),
            Self::IntermediateResponse(op) => op.to_element(app(tags::INTERMEDIATE_RESPONSE)),
        }
    }

    /// Reads the wire form.
    pub fn from_element(element: Element) -> Result<Self> {
        let id = element.id();
        if id.class() != Class::Application {
            return Err(Error::decode("protocolOp", format!("unexpected tag {id}")));
        }
        let op = match id.number() {
            tags::BIND_REQUEST => Self::BindRequest(BindRequest::from_element(element)?),
            tags::BIND_RESPONSE => Self::BindResponse(BindResponse::from_element(element)?),
            tags::UNBIND_REQUEST => {
                if !element.as_octets()?.is_empty() {
                    return Err(Error::decode("UnbindRequest", "NULL must have no content"));
                }
                Self::UnbindRequest
            }
            tags::SEARCH_REQUEST => Self::SearchRequest(SearchRequest::from_element(element)?),
            tags::SEARCH_RESULT_ENTRY => {
                Self::SearchResultEntry(SearchResultEntry::from_element(element)?)
            }
            tags::SEARCH_RESULT_DONE => {
                Self::SearchResultDone(LdapResult::from_element("SearchResultDone", element)?)
            }
            tags::SEARCH_RESULT_REFERENCE => Self::SearchResultReference(
                element
                    .into_children()?
                    .iter()
                    .map(Element::to_utf8)
                    .collect::<ldapkit_ber::Result<Vec<_>>>()?,
            ),
            tags::MODIFY_REQUEST => Self::ModifyRequest(ModifyRequest::from_element(element)?),
            tags::MODIFY_RESPONSE => {
                Self::ModifyResponse(LdapResult::from_element("ModifyResponse", element)?)
            }
            tags::ADD_REQUEST => Self::AddRequest(AddRequest::from_element(element)?),
            tags::ADD_RESPONSE => {
                Self::AddResponse(LdapResult::from_element("AddResponse", element)?)
            }
            tags::DEL_REQUEST => Self::DelRequest(element.to_utf8()?),
            tags::DEL_RESPONSE => {
                Self::DelResponse(LdapResult::from_element("DelResponse", element)?)
            }
            tags::MODIFY_DN_REQUEST => {
                Self::ModifyDnRequest(ModifyDnRequest::from_element(element)?)
            }
            tags::MODIFY_DN_RESPONSE => {
                Self::ModifyDnResponse(LdapResult::from_element("ModifyDNResponse", element)?)
            }
            tags::COMPARE_REQUEST => Self::CompareRequest(CompareRequest::from_element(element)?),
            tags::COMPARE_RESPONSE => {
                Self::CompareResponse(LdapResult::from_element("CompareResponse", element)?)
            }
            tags::ABANDON_REQUEST => {
                let raw = element.to_i32()?;
                let id = MessageId::new(raw)
                    .ok_or_else(|| Error::decode("AbandonRequest", format!("invalid id {raw}")))?;
                Self::AbandonRequest(id)
            }
            tags::EXTENDED_REQUEST => {
                Self::ExtendedRequest(ExtendedRequest::from_element(element)?)
            }
            tags::EXTENDED_RESPONSE => {
                Self::ExtendedResponse(ExtendedResponse::from_element(element)?)
            }
            tags::INTERMEDIATE_RESPONSE => {
                Self::IntermediateResponse(IntermediateResponse::from_element(element)?)
            }
            other => {
                return Err(Error::decode(
                    "protocolOp",
                    format!("unknown operation [APPLICATION {other}]"),
                ));
            }
        };
        Ok(op)
    }
}

/// Per-request options supplied by the application.
///
/// Controls are attached to the outgoing envelope. The time limit bounds
/// how long the caller waits for responses; it is enforced on the client
/// and never sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    controls: Controls,
    time_limit: Option<Duration>,
}

impl Constraints {
    /// Constraints with no controls and no time limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            controls: Controls::new(),
            time_limit: None,
        }
    }

    /// Adds a server control.
    #[must_use]
    pub fn with_control(mut self, control: impl Into<Control>) -> Self {
        self.controls.push(control);
        self
    }

    /// Sets the client-side response time limit.
    #[must_use]
    pub const fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Returns the server controls.
    #[must_use]
    pub const fn controls(&self) -> &Controls {
        &self.controls
    }

    /// Returns the client-side time limit.
    #[must_use]
    pub const fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
}

/// A complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapMessage {
    message_id: MessageId,
    op: ProtocolOp,
    controls: Option<Controls>,
}

impl LdapMessage {
    /// Creates a message without controls.
    #[must_use]
    pub const fn new(message_id: MessageId, op: ProtocolOp) -> Self {
        Self {
            message_id,
            op,
            controls: None,
        }
    }

    /// Attaches controls. An empty list leaves the message without controls.
    #[must_use]
    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = (!controls.is_empty()).then_some(controls);
        self
    }

    /// Attaches the controls of `constraints`.
    #[must_use]
    pub fn with_constraints(self, constraints: &Constraints) -> Self {
        self.with_controls(constraints.controls.clone())
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Returns the protocol operation.
    #[must_use]
    pub const fn op(&self) -> &ProtocolOp {
        &self.op
    }

    /// Consumes the message, returning its operation.
    #[must_use]
    pub fn into_op(self) -> ProtocolOp {
        self.op
    }

    /// Returns the controls, if any.
    #[must_use]
    pub const fn controls(&self) -> Option<&Controls> {
        self.controls.as_ref()
    }

    /// Builds the wire form.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut children = vec![
            Element::integer(i64::from(self.message_id.get())),
            self.op.to_element(),
        ];
        if let Some(controls) = &self.controls {
            children.push(controls.to_element());
        }
        Element::sequence(children)
    }

    /// Encodes the message.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        self.to_element().to_bytes()
    }

    /// Reads the wire form.
    pub fn from_element(element: Element) -> Result<Self> {
        element.expect_tag("LDAPMessage", Identifier::SEQUENCE)?;
        let mut reader = SequenceReader::new("LDAPMessage", element)?;
        let raw_id = reader.next(Identifier::INTEGER, "messageID")?.to_i32()?;
        let message_id = MessageId::new(raw_id)
            .ok_or_else(|| Error::decode("LDAPMessage", format!("negative message id {raw_id}")))?;
        let op = ProtocolOp::from_element(reader.next_any("protocolOp")?)?;
        let controls = reader
            .optional(CONTROLS_TAG)
            .map(Controls::from_element)
            .transpose()?
            .filter(|c| !c.is_empty());
        reader.finish()?;
        Ok(Self {
            message_id,
            op,
            controls,
        })
    }

    /// Decodes exactly one message with default decoder limits.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_with(bytes, &DecoderConfig::default())
    }

    /// Decodes exactly one message with the given decoder limits.
    pub fn decode_with(bytes: &[u8], config: &DecoderConfig) -> Result<Self> {
        Self::from_element(config.decode_exact(bytes)?)
    }
}

/// A decoded inbound message with its controls upgraded through a registry.
#[derive(Debug)]
pub struct ReceivedMessage {
    message: LdapMessage,
    controls: Vec<Box<dyn ResponseControl>>,
}

impl ReceivedMessage {
    /// Upgrades the controls of `message` using `registry`.
    #[must_use]
    pub fn new(message: LdapMessage, registry: &ControlRegistry) -> Self {
        let controls = message
            .controls()
            .map(|controls| {
                controls
                    .as_slice()
                    .iter()
                    .map(|c| registry.instantiate(c.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Self { message, controls }
    }

    /// Decodes a message and upgrades its controls.
    pub fn decode(bytes: &[u8], registry: &ControlRegistry) -> Result<Self> {
        Ok(Self::new(LdapMessage::decode(bytes)?, registry))
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message.message_id()
    }

    /// Returns the protocol operation.
    #[must_use]
    pub const fn op(&self) -> &ProtocolOp {
        self.message.op()
    }

    /// Returns the underlying message.
    #[must_use]
    pub const fn message(&self) -> &LdapMessage {
        &self.message
    }

    /// Consumes the wrapper, returning the underlying message.
    #[must_use]
    pub fn into_message(self) -> LdapMessage {
        self.message
    }

    /// Returns the controls in wire order.
    #[must_use]
    pub fn controls(&self) -> &[Box<dyn ResponseControl>] {
        &self.controls
    }

    /// Returns the first control of type `T`.
    #[must_use]
    pub fn control<T: ResponseControl>(&self) -> Option<&T> {
        self.controls.iter().find_map(|c| downcast::<T>(c.as_ref()))
    }

    /// Returns `true` if this message ends its operation.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.message.op().is_terminal()
    }
}
