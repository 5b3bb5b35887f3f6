//! LDAP controls.
//!
//! A [`Control`] is the generic form every control takes on the wire:
//!
//! ```text
//! Control ::= SEQUENCE {
//!     controlType   LDAPOID,
//!     criticality   BOOLEAN DEFAULT FALSE,
//!     controlValue  OCTET STRING OPTIONAL }
//! ```
//!
//! Received controls are upgraded to typed controls through the
//! [`ControlRegistry`]. Typed controls implement [`ResponseControl`] and are
//! recovered from a received message by downcasting.

mod paged;
mod registry;
mod sort;

use std::any::Any;
use std::fmt;

use ldapkit_ber::{Element, Identifier, SequenceReader};

use crate::Result;

pub use paged::PagedResults;
pub use registry::{ControlFactory, ControlRegistry};
pub use sort::{SortKey, SortRequest, SortResponse};

/// Context tag of the `controls` field of an `LDAPMessage`.
pub(crate) const CONTROLS_TAG: Identifier = Identifier::context(0, true);

/// A control in its generic form.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Control {
    oid: String,
    critical: bool,
    value: Option<Vec<u8>>,
}

impl Control {
    /// Creates a control.
    #[must_use]
    pub fn new(oid: impl Into<String>, critical: bool, value: Option<Vec<u8>>) -> Self {
        Self {
            oid: oid.into(),
            critical,
            value,
        }
    }

    /// Returns the control type OID.
    #[must_use]
    pub fn oid(&self) -> &str {
        &self.oid
    }

    /// Returns the criticality flag.
    #[must_use]
    pub const fn is_critical(&self) -> bool {
        self.critical
    }

    /// Returns the control value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// Builds the wire form. Criticality is written only when true.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut children = vec![Element::string(&self.oid)];
        if self.critical {
            children.push(Element::boolean(true));
        }
        if let Some(value) = &self.value {
            children.push(Element::octet_string(value.clone()));
        }
        Element::sequence(children)
    }

    /// Reads the wire form.
    ///
    /// The element after the OID is the criticality only if it is a BOOLEAN;
    /// otherwise criticality takes its default and the element is the value.
    pub fn from_element(element: Element) -> Result<Self> {
        let mut reader = SequenceReader::new("Control", element)?;
        let oid = reader
            .next(Identifier::OCTET_STRING, "controlType")?
            .to_utf8()?;
        let critical = reader.bool_or(Identifier::BOOLEAN, false)?;
        let value = reader
            .optional(Identifier::OCTET_STRING)
            .map(Element::into_octets)
            .transpose()?;
        reader.finish()?;
        Ok(Self {
            oid,
            critical,
            value,
        })
    }
}

/// Ordered list of controls attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Controls(Vec<Control>);

impl Controls {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a control, keeping insertion order.
    pub fn push(&mut self, control: impl Into<Control>) {
        self.0.push(control.into());
    }

    /// Adds a control, builder style.
    #[must_use]
    pub fn with(mut self, control: impl Into<Control>) -> Self {
        self.push(control);
        self
    }

    /// Returns the controls in order.
    #[must_use]
    pub fn as_slice(&self) -> &[Control] {
        &self.0
    }

    /// Returns the first control with the given OID.
    #[must_use]
    pub fn find(&self, oid: &str) -> Option<&Control> {
        self.0.iter().find(|c| c.oid == oid)
    }

    /// Number of controls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no controls.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds the `[0]` tagged wire form.
    #[must_use]
    pub fn to_element(&self) -> Element {
        Element::constructed(
            CONTROLS_TAG,
            self.0.iter().map(Control::to_element).collect(),
        )
    }

    /// Reads the wire form. The tag itself is not checked.
    pub fn from_element(element: Element) -> Result<Self> {
        element
            .into_children()?
            .into_iter()
            .map(Control::from_element)
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl From<Vec<Control>> for Controls {
    fn from(controls: Vec<Control>) -> Self {
        Self(controls)
    }
}

impl IntoIterator for Controls {
    type Item = Control;
    type IntoIter = std::vec::IntoIter<Control>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Controls {
    type Item = &'a Control;
    type IntoIter = std::slice::Iter<'a, Control>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A control as seen by application code after decoding.
///
/// Implemented by [`Control`] itself and by every typed control. Use
/// [`downcast`] to recover the concrete type.
pub trait ResponseControl: fmt::Debug + Send + Sync + 'static {
    /// Returns the generic form the control was decoded from.
    fn control(&self) -> &Control;

    /// Returns `self` as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the control type OID.
    fn oid(&self) -> &str {
        self.control().oid()
    }
}

impl ResponseControl for Control {
    fn control(&self) -> &Control {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A typed control that can be built from its generic form.
pub trait DecodeControl: ResponseControl + Sized {
    /// Control type OID this type handles.
    const OID: &'static str;

    /// Parses the generic form.
    fn from_control(control: &Control) -> Result<Self>;
}

/// Downcasts a decoded control to a concrete type.
#[must_use]
pub fn downcast<T: ResponseControl>(control: &dyn ResponseControl) -> Option<&T> {
    control.as_any().downcast_ref::<T>()
}
