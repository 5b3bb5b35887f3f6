//! Simple paged results control (RFC 2696).

use std::any::Any;

use ldapkit_ber::{Element, Identifier, SequenceReader, decode_exact};

use super::{Control, DecodeControl, ResponseControl};
use crate::{Error, Result};

/// Paged results control, used in both directions.
///
/// ```text
/// realSearchControlValue ::= SEQUENCE {
///     size    INTEGER (0..maxInt),
///     cookie  OCTET STRING }
/// ```
///
/// On a request `size` is the page size; on a response it is the server's
/// estimate of the total result count. An empty cookie on a response marks
/// the last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedResults {
    size: i32,
    cookie: Vec<u8>,
    control: Control,
}

impl PagedResults {
    /// Creates the control.
    pub fn new(size: i32, cookie: impl Into<Vec<u8>>, critical: bool) -> Result<Self> {
        if size < 0 {
            return Err(Error::invalid_parameter(format!(
                "page size must not be negative, got {size}"
            )));
        }
        let cookie = cookie.into();
        let value = Element::sequence(vec![
            Element::integer(i64::from(size)),
            Element::octet_string(cookie.clone()),
        ]);
        Ok(Self {
            size,
            cookie,
            control: Control::new(Self::OID, critical, Some(value.to_bytes().to_vec())),
        })
    }

    /// Page size or result count estimate.
    #[must_use]
    pub const fn size(&self) -> i32 {
        self.size
    }

    /// Opaque server cookie.
    #[must_use]
    pub fn cookie(&self) -> &[u8] {
        &self.cookie
    }

    /// Returns `true` when the server signalled there are no more pages.
    #[must_use]
    pub fn is_last_page(&self) -> bool {
        self.cookie.is_empty()
    }
}

impl ResponseControl for PagedResults {
    fn control(&self) -> &Control {
        &self.control
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeControl for PagedResults {
    const OID: &'static str = "1.2.840.113556.1.4.319";

    fn from_control(control: &Control) -> Result<Self> {
        let value = control
            .value()
            .ok_or_else(|| Error::decode("PagedResults", "control has no value"))?;
        let mut reader = SequenceReader::new("PagedResults", decode_exact(value)?)?;
        let size = reader.next(Identifier::INTEGER, "size")?.to_i32()?;
        let cookie = reader
            .next(Identifier::OCTET_STRING, "cookie")?
            .into_octets()?;
        reader.finish()?;
        Ok(Self {
            size,
            cookie,
            control: control.clone(),
        })
    }
}

impl From<PagedResults> for Control {
    fn from(paged: PagedResults) -> Self {
        paged.control
    }
}
