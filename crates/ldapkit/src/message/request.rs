//! Request bodies.
//!
//! Builders validate their arguments before anything is encoded. Each type
//! is encoded and decoded by the same struct, so a request built here and a
//! request read off the wire compare equal.

use ldapkit_ber::{Element, Identifier, SequenceReader};

use super::attribute::{Attribute, attribute_list, read_attribute_list, read_strings, strings};
use super::tags;
use crate::filter::{AttributeValueAssertion, Filter};
use crate::types::{DerefAliases, ModifyOperation, SearchScope};
use crate::{Error, Result};

const SIMPLE: Identifier = Identifier::context(0, false);
const SASL: Identifier = Identifier::context(3, true);
const NEW_SUPERIOR: Identifier = Identifier::context(0, false);
const REQUEST_NAME: Identifier = Identifier::context(0, false);
const REQUEST_VALUE: Identifier = Identifier::context(1, false);

/// LDAP protocol version sent in bind requests.
pub const LDAP_VERSION: i32 = 3;

fn app(number: u32) -> Identifier {
    Identifier::application(number, true)
}

fn require_dn(what: &str, dn: &str) -> Result<()> {
    if dn.trim().is_empty() {
        return Err(Error::invalid_parameter(format!("{what} requires a distinguished name")));
    }
    Ok(())
}

/// Authentication choice of a bind request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// Simple bind with a password.
    Simple(Vec<u8>),
    /// SASL bind.
    Sasl {
        /// SASL mechanism name.
        mechanism: String,
        /// Mechanism-specific credentials.
        credentials: Option<Vec<u8>>,
    },
}

/// Bind request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    /// Protocol version.
    pub version: i32,
    /// Name to bind as; empty for anonymous binds.
    pub name: String,
    /// Credentials.
    pub authentication: Authentication,
}

impl BindRequest {
    /// Simple bind. An empty name and password is an anonymous bind.
    #[must_use]
    pub fn simple(name: impl Into<String>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            version: LDAP_VERSION,
            name: name.into(),
            authentication: Authentication::Simple(password.into()),
        }
    }

    /// SASL bind.
    pub fn sasl(
        name: impl Into<String>,
        mechanism: impl Into<String>,
        credentials: Option<Vec<u8>>,
    ) -> Result<Self> {
        let mechanism = mechanism.into();
        if mechanism.is_empty() {
            return Err(Error::invalid_parameter("SASL bind requires a mechanism"));
        }
        Ok(Self {
            version: LDAP_VERSION,
            name: name.into(),
            authentication: Authentication::Sasl {
                mechanism,
                credentials,
            },
        })
    }

    pub(crate) fn to_element(&self) -> Element {
        let authentication = match &self.authentication {
            Authentication::Simple(password) => Element::primitive(SIMPLE, password.clone()),
            Authentication::Sasl {
                mechanism,
                credentials,
            } => {
                let mut children = vec![Element::string(mechanism)];
                if let Some(credentials) = credentials {
                    children.push(Element::octet_string(credentials.clone()));
                }
                Element::constructed(SASL, children)
            }
        };
        Element::constructed(
            app(tags::BIND_REQUEST),
            vec![
                Element::integer(i64::from(self.version)),
                Element::string(&self.name),
                authentication,
            ],
        )
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("BindRequest", element)?;
        let version = reader.next(Identifier::INTEGER, "version")?.to_i32()?;
        let name = reader.next(Identifier::OCTET_STRING, "name")?.to_utf8()?;
        let auth = reader.next_any("authentication")?;
        reader.finish()?;

        let authentication = if auth.has_tag(SIMPLE) {
            Authentication::Simple(auth.into_octets()?)
        } else if auth.has_tag(SASL) {
            let mut sasl = SequenceReader::new("SaslCredentials", auth)?;
            let mechanism = sasl.next(Identifier::OCTET_STRING, "mechanism")?.to_utf8()?;
            let credentials = sasl
                .optional(Identifier::OCTET_STRING)
                .map(Element::into_octets)
                .transpose()?;
            sasl.finish()?;
            Authentication::Sasl {
                mechanism,
                credentials,
            }
        } else {
            return Err(Error::decode(
                "BindRequest",
                format!("unsupported authentication choice {}", auth.id()),
            ));
        };

        Ok(Self {
            version,
            name,
            authentication,
        })
    }
}

/// Search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Base object DN.
    pub base: String,
    /// Search scope.
    pub scope: SearchScope,
    /// Alias dereferencing policy.
    pub deref_aliases: DerefAliases,
    /// Maximum number of entries; 0 for no limit.
    pub size_limit: i32,
    /// Maximum server time in seconds; 0 for no limit.
    pub time_limit: i32,
    /// Return attribute names only.
    pub types_only: bool,
    /// Compiled filter.
    pub filter: Filter,
    /// Attributes to return; empty for all user attributes.
    pub attributes: Vec<String>,
}

impl SearchRequest {
    /// Creates a search request, compiling `filter`.
    pub fn new(base: impl Into<String>, scope: SearchScope, filter: &str) -> Result<Self> {
        Ok(Self::with_filter(base, scope, Filter::parse(filter)?))
    }

    /// Creates a search request from a compiled filter.
    #[must_use]
    pub fn with_filter(base: impl Into<String>, scope: SearchScope, filter: Filter) -> Self {
        Self {
            base: base.into(),
            scope,
            deref_aliases: DerefAliases::Never,
            size_limit: 0,
            time_limit: 0,
            types_only: false,
            filter,
            attributes: Vec::new(),
        }
    }

    /// Sets the attributes to return.
    #[must_use]
    pub fn attributes<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the entry count limit.
    pub fn size_limit(mut self, limit: i32) -> Result<Self> {
        if limit < 0 {
            return Err(Error::invalid_parameter("size limit must not be negative"));
        }
        self.size_limit = limit;
        Ok(self)
    }

    /// Sets the server-side time limit in seconds.
    pub fn time_limit(mut self, seconds: i32) -> Result<Self> {
        if seconds < 0 {
            return Err(Error::invalid_parameter("time limit must not be negative"));
        }
        self.time_limit = seconds;
        Ok(self)
    }

    /// Sets the alias dereferencing policy.
    #[must_use]
    pub const fn deref_aliases(mut self, deref: DerefAliases) -> Self {
        self.deref_aliases = deref;
        self
    }

    /// Requests attribute names without values.
    #[must_use]
    pub const fn types_only(mut self, types_only: bool) -> Self {
        self.types_only = types_only;
        self
    }

    pub(crate) fn to_element(&self) -> Element {
        Element::constructed(
            app(tags::SEARCH_REQUEST),
            vec![
                Element::string(&self.base),
                Element::enumerated(self.scope.code()),
                Element::enumerated(self.deref_aliases.code()),
                Element::integer(i64::from(self.size_limit)),
                Element::integer(i64::from(self.time_limit)),
                Element::boolean(self.types_only),
                self.filter.to_element(),
                strings(&self.attributes),
            ],
        )
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("SearchRequest", element)?;
        let base = reader
            .next(Identifier::OCTET_STRING, "baseObject")?
            .to_utf8()?;
        let scope = reader.next(Identifier::ENUMERATED, "scope")?.to_integer()?;
        let scope = SearchScope::from_code(scope)?;
        let deref_aliases = reader
            .next(Identifier::ENUMERATED, "derefAliases")?
            .to_integer()?;
        let deref_aliases = DerefAliases::from_code(deref_aliases)?;
        let size_limit = reader.next(Identifier::INTEGER, "sizeLimit")?.to_i32()?;
        let time_limit = reader.next(Identifier::INTEGER, "timeLimit")?.to_i32()?;
        let types_only = reader.next(Identifier::BOOLEAN, "typesOnly")?.to_bool()?;
        let filter = Filter::from_element(reader.next_any("filter")?)?;
        let attributes = read_strings(
            "SearchRequest.attributes",
            reader.next(Identifier::SEQUENCE, "attributes")?,
        )?;
        reader.finish()?;
        Ok(Self {
            base,
            scope,
            deref_aliases,
            size_limit,
            time_limit,
            types_only,
            filter,
            attributes,
        })
    }
}

/// One change of a modify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    /// Kind of change.
    pub operation: ModifyOperation,
    /// Attribute and values the change applies to.
    pub attribute: Attribute,
}

impl Modification {
    /// Creates a modification.
    #[must_use]
    pub const fn new(operation: ModifyOperation, attribute: Attribute) -> Self {
        Self {
            operation,
            attribute,
        }
    }
}

/// Modify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRequest {
    /// DN of the entry to modify.
    pub object: String,
    /// Changes, applied in order.
    pub changes: Vec<Modification>,
}

impl ModifyRequest {
    /// Creates a modify request. At least one change is required.
    pub fn new(object: impl Into<String>, changes: Vec<Modification>) -> Result<Self> {
        let object = object.into();
        require_dn("modify", &object)?;
        if changes.is_empty() {
            return Err(Error::invalid_parameter("modify requires at least one change"));
        }
        if let Some(change) = changes.iter().find(|c| c.attribute.name.is_empty()) {
            return Err(Error::invalid_parameter(format!(
                "{:?} modification has no attribute name",
                change.operation
            )));
        }
        Ok(Self { object, changes })
    }

    pub(crate) fn to_element(&self) -> Element {
        let changes = self
            .changes
            .iter()
            .map(|c| {
                Element::sequence(vec![
                    Element::enumerated(c.operation.code()),
                    c.attribute.to_element(),
                ])
            })
            .collect();
        Element::constructed(
            app(tags::MODIFY_REQUEST),
            vec![Element::string(&self.object), Element::sequence(changes)],
        )
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("ModifyRequest", element)?;
        let object = reader.next(Identifier::OCTET_STRING, "object")?.to_utf8()?;
        let changes = reader
            .next(Identifier::SEQUENCE, "modification")?
            .into_children()?
            .into_iter()
            .map(|change| {
                let mut change = SequenceReader::new("ModifyRequest.change", change)?;
                let operation = change
                    .next(Identifier::ENUMERATED, "operation")?
                    .to_integer()?;
                let operation = ModifyOperation::from_code(operation)?;
                let attribute = Attribute::from_element(
                    "ModifyRequest.modification",
                    change.next(Identifier::SEQUENCE, "modification")?,
                )?;
                change.finish()?;
                Ok(Modification {
                    operation,
                    attribute,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        reader.finish()?;
        Ok(Self { object, changes })
    }
}

/// Add request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    /// DN of the new entry.
    pub entry: String,
    /// Attributes of the new entry, in the order given.
    pub attributes: Vec<Attribute>,
}

impl AddRequest {
    /// Creates an add request from a DN and attribute name to values pairs.
    ///
    /// Attribute and value order is kept exactly as given, so the same input
    /// always encodes to the same bytes.
    pub fn new(entry: impl Into<String>, attributes: Vec<Attribute>) -> Result<Self> {
        let entry = entry.into();
        require_dn("add", &entry)?;
        if attributes.is_empty() {
            return Err(Error::invalid_parameter("add requires at least one attribute"));
        }
        for attribute in &attributes {
            if attribute.name.is_empty() {
                return Err(Error::invalid_parameter("attribute name must not be empty"));
            }
            if attribute.values.is_empty() {
                return Err(Error::invalid_parameter(format!(
                    "attribute {} has no values",
                    attribute.name
                )));
            }
        }
        Ok(Self { entry, attributes })
    }

    pub(crate) fn to_element(&self) -> Element {
        Element::constructed(
            app(tags::ADD_REQUEST),
            vec![
                Element::string(&self.entry),
                attribute_list(&self.attributes),
            ],
        )
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("AddRequest", element)?;
        let entry = reader.next(Identifier::OCTET_STRING, "entry")?.to_utf8()?;
        let attributes = read_attribute_list(
            "AddRequest.attribute",
            reader.next(Identifier::SEQUENCE, "attributes")?,
        )?;
        reader.finish()?;
        Ok(Self { entry, attributes })
    }
}

/// Modify DN request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyDnRequest {
    /// DN of the entry to rename.
    pub entry: String,
    /// New RDN.
    pub new_rdn: String,
    /// Remove the old RDN values from the entry.
    pub delete_old_rdn: bool,
    /// New parent, if the entry moves.
    pub new_superior: Option<String>,
}

impl ModifyDnRequest {
    /// Creates a rename, optionally moving the entry under `new_superior`.
    pub fn new(
        entry: impl Into<String>,
        new_rdn: impl Into<String>,
        delete_old_rdn: bool,
        new_superior: Option<String>,
    ) -> Result<Self> {
        let entry = entry.into();
        let new_rdn = new_rdn.into();
        require_dn("modify DN", &entry)?;
        if new_rdn.trim().is_empty() {
            return Err(Error::invalid_parameter("modify DN requires a new RDN"));
        }
        Ok(Self {
            entry,
            new_rdn,
            delete_old_rdn,
            new_superior,
        })
    }

    pub(crate) fn to_element(&self) -> Element {
        let mut children = vec![
            Element::string(&self.entry),
            Element::string(&self.new_rdn),
            Element::boolean(self.delete_old_rdn),
        ];
        if let Some(superior) = &self.new_superior {
            children.push(Element::string(superior).implicit(NEW_SUPERIOR));
        }
        Element::constructed(app(tags::MODIFY_DN_REQUEST), children)
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("ModifyDNRequest", element)?;
        let entry = reader.next(Identifier::OCTET_STRING, "entry")?.to_utf8()?;
        let new_rdn = reader.next(Identifier::OCTET_STRING, "newrdn")?.to_utf8()?;
        let delete_old_rdn = reader.next(Identifier::BOOLEAN, "deleteoldrdn")?.to_bool()?;
        let new_superior = reader
            .optional(NEW_SUPERIOR)
            .map(|e| e.to_utf8())
            .transpose()?;
        reader.finish()?;
        Ok(Self {
            entry,
            new_rdn,
            delete_old_rdn,
            new_superior,
        })
    }
}

/// Compare request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareRequest {
    /// DN of the entry to compare against.
    pub entry: String,
    /// Attribute and value to compare.
    pub assertion: AttributeValueAssertion,
}

impl CompareRequest {
    /// Creates a compare request.
    pub fn new(
        entry: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let entry = entry.into();
        let attribute = attribute.into();
        require_dn("compare", &entry)?;
        if attribute.is_empty() {
            return Err(Error::invalid_parameter("compare requires an attribute"));
        }
        Ok(Self {
            entry,
            assertion: AttributeValueAssertion {
                attribute,
                value: value.into(),
            },
        })
    }

    pub(crate) fn to_element(&self) -> Element {
        Element::constructed(
            app(tags::COMPARE_REQUEST),
            vec![
                Element::string(&self.entry),
                Element::sequence(vec![
                    Element::string(&self.assertion.attribute),
                    Element::octet_string(self.assertion.value.clone()),
                ]),
            ],
        )
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("CompareRequest", element)?;
        let entry = reader.next(Identifier::OCTET_STRING, "entry")?.to_utf8()?;
        let ava = reader.next(Identifier::SEQUENCE, "ava")?;
        let mut ava = SequenceReader::new("CompareRequest.ava", ava)?;
        let attribute = ava
            .next(Identifier::OCTET_STRING, "attributeDesc")?
            .to_utf8()?;
        let value = ava
            .next(Identifier::OCTET_STRING, "assertionValue")?
            .into_octets()?;
        ava.finish()?;
        reader.finish()?;
        Ok(Self {
            entry,
            assertion: AttributeValueAssertion { attribute, value },
        })
    }
}

/// Extended request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedRequest {
    /// Request OID.
    pub name: String,
    /// Request value.
    pub value: Option<Vec<u8>>,
}

impl ExtendedRequest {
    /// Creates an extended request.
    pub fn new(name: impl Into<String>, value: Option<Vec<u8>>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_parameter("extended request requires an OID"));
        }
        Ok(Self { name, value })
    }

    pub(crate) fn to_element(&self) -> Element {
        let mut children = vec![Element::string(&self.name).implicit(REQUEST_NAME)];
        if let Some(value) = &self.value {
            children.push(Element::primitive(REQUEST_VALUE, value.clone()));
        }
        Element::constructed(app(tags::EXTENDED_REQUEST), children)
    }

    pub(crate) fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("ExtendedRequest", element)?;
        let name = reader.next(REQUEST_NAME, "requestName")?.to_utf8()?;
        let value = reader
            .optional(REQUEST_VALUE)
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

    #[test]
    fn test_simple_bind_wire() {
        let bind = BindRequest::simple("cn=a", "pw");
        assert_eq!(
            &bind.to_element().to_bytes()[..],
            &[
                0x60, 0x0D, 0x02, 0x01, 0x03, 0x04, 0x04, b'c', b'n', b'=', b'a', 0x80, 0x02, b'p',
                b'w',
            ]
        );
    }

    #[test]
    fn test_sasl_bind_roundtrip() {
        let bind = BindRequest::sasl("", "EXTERNAL", None).unwrap();
        assert_eq!(BindRequest::from_element(bind.to_element()).unwrap(), bind);
        let bind = BindRequest::sasl("", "PLAIN", Some(b"\0u\0p".to_vec())).unwrap();
        assert_eq!(BindRequest::from_element(bind.to_element()).unwrap(), bind);
        assert!(BindRequest::sasl("", "", None).is_err());
    }

    #[test]
    fn test_search_roundtrip() {
        let search = SearchRequest::new(
            "dc=example,dc=com",
            SearchScope::SingleLevel,
            "(&(objectClass=person)(cn=J*))",
        )
        .unwrap()
        .attributes(["cn", "mail"])
        .size_limit(10)
        .unwrap()
        .deref_aliases(DerefAliases::Always);
        let decoded = SearchRequest::from_element(search.to_element()).unwrap();
        assert_eq!(decoded, search);
        assert_eq!(decoded.attributes, vec!["cn", "mail"]);
    }

    #[test]
    fn test_search_rejects_bad_input() {
        assert!(matches!(
            SearchRequest::new("", SearchScope::BaseObject, "(cn=Bob"),
            Err(Error::FilterSyntax { .. })
        ));
        let search = SearchRequest::new("", SearchScope::BaseObject, "(objectClass=*)").unwrap();
        assert!(search.clone().size_limit(-1).is_err());
        assert!(search.time_limit(-5).is_err());
    }

    #[test]
    fn test_add_is_deterministic() {
        let build = || {
            AddRequest::new(
                "cn=Bob,dc=example",
                vec![
                    Attribute::new("objectClass", ["top", "person"]),
                    Attribute::new("cn", ["Bob"]),
                    Attribute::new("sn", ["Smith"]),
                ],
            )
            .unwrap()
            .to_element()
            .to_bytes()
        };
        assert_eq!(build(), build());

        let add = AddRequest::from_element(ldapkit_ber::decode_exact(&build()).unwrap()).unwrap();
        let names: Vec<_> = add.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["objectClass", "cn", "sn"]);
        assert_eq!(
            add.attributes[0].values,
            vec![b"top".to_vec(), b"person".to_vec()]
        );
    }

    #[test]
    fn test_add_parameter_errors() {
        assert!(matches!(
            AddRequest::new("", vec![Attribute::new("cn", ["x"])]),
            Err(Error::InvalidParameter(_))
        ));
        assert!(AddRequest::new("cn=x", vec![]).is_err());
        let empty = Attribute::new("cn", Vec::<Vec<u8>>::new());
        assert!(AddRequest::new("cn=x", vec![empty]).is_err());
        assert!(AddRequest::new("cn=x", vec![Attribute::new("", ["x"])]).is_err());
    }

    #[test]
    fn test_modify_roundtrip() {
        let modify = ModifyRequest::new(
            "cn=Bob",
            vec![
                Modification::new(ModifyOperation::Replace, Attribute::new("mail", ["b@x"])),
                Modification::new(
                    ModifyOperation::Delete,
                    Attribute::new("phone", Vec::<Vec<u8>>::new()),
                ),
            ],
        )
        .unwrap();
        assert_eq!(
            ModifyRequest::from_element(modify.to_element()).unwrap(),
            modify
        );
        assert!(ModifyRequest::new("cn=Bob", vec![]).is_err());
    }

    #[test]
    fn test_modify_dn_optional_superior() {
        let rename = ModifyDnRequest::new("cn=a,o=x", "cn=b", true, None).unwrap();
        assert_eq!(rename.to_element().children().unwrap().len(), 3);
        assert_eq!(
            ModifyDnRequest::from_element(rename.to_element()).unwrap(),
            rename
        );

        let moved =
            ModifyDnRequest::new("cn=a,o=x", "cn=a", false, Some("o=y".to_string())).unwrap();
        assert_eq!(
            ModifyDnRequest::from_element(moved.to_element()).unwrap(),
            moved
        );
        assert!(ModifyDnRequest::new("cn=a", " ", false, None).is_err());
    }

    #[test]
    fn test_compare_roundtrip() {
        let compare = CompareRequest::new("cn=a", "sn", "x").unwrap();
        assert_eq!(
            CompareRequest::from_element(compare.to_element()).unwrap(),
            compare
        );
        assert!(CompareRequest::new("cn=a", "", "x").is_err());
    }

    #[test]
    fn test_extended_value_optional() {
        let ext = ExtendedRequest::new("1.3.6.1.4.1.4203.1.11.3", None).unwrap();
        assert_eq!(ext.to_element().children().unwrap().len(), 1);
        assert_eq!(
            ExtendedRequest::from_element(ext.to_element()).unwrap(),
            ext
        );
        assert!(ExtendedRequest::new("", None).is_err());
    }
}
