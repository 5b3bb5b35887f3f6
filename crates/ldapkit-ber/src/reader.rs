//! Positional reading of SEQUENCE components.

use std::collections::VecDeque;

use crate::element::Element;
use crate::identifier::Identifier;
use crate::{Error, Result};

/// Consumes the children of a constructed element in order.
///
/// OPTIONAL and DEFAULT components are resolved by looking at the tag of
/// the next child. Callers decode fields in declaration order and then call
/// [`SequenceReader::finish`] to reject unexpected extra children.
#[derive(Debug)]
pub struct SequenceReader {
    context: &'static str,
    children: VecDeque<Element>,
}

impl SequenceReader {
    /// Creates a reader over the children of `element`.
    pub fn new(context: &'static str, element: Element) -> Result<Self> {
        Ok(Self {
            context,
            children: element.into_children()?.into(),
        })
    }

    /// Creates a reader over an already extracted list of children.
    #[must_use]
    pub fn from_children(context: &'static str, children: Vec<Element>) -> Self {
        Self {
            context,
            children: children.into(),
        }
    }

    /// Returns the next child, which must carry the tag of `expected`.
    pub fn next(&mut self, expected: Identifier, field: &'static str) -> Result<Element> {
        match self.children.pop_front() {
            Some(child) if child.has_tag(expected) => Ok(child),
            Some(child) => Err(Error::UnexpectedTag {
                context: self.context,
                expected,
                found: child.id(),
            }),
            None => Err(Error::MissingElement {
                context: self.context,
                expected: field,
            }),
        }
    }

    /// Returns the next child regardless of its tag.
    pub fn next_any(&mut self, field: &'static str) -> Result<Element> {
        self.children.pop_front().ok_or(Error::MissingElement {
            context: self.context,
            expected: field,
        })
    }

    /// Returns the next child only if it carries the tag of `expected`.
    pub fn optional(&mut self, expected: Identifier) -> Option<Element> {
        if self.peek().is_some_and(|child| child.has_tag(expected)) {
            self.children.pop_front()
        } else {
            None
        }
    }

    /// Reads a BOOLEAN component with a DEFAULT value.
    ///
    /// If the next child does not carry `expected`, the component is absent
    /// and `default` is returned without consuming anything.
    pub fn bool_or(&mut self, expected: Identifier, default: bool) -> Result<bool> {
        self.optional(expected)
            .map_or(Ok(default), |child| child.to_bool())
    }

    /// Returns the next child without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<&Element> {
        self.children.front()
    }

    /// Number of children not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.children.len()
    }

    /// Consumes all remaining children.
    pub fn rest(&mut self) -> Vec<Element> {
        self.children.drain(..).collect()
    }

    /// Checks that every child was consumed.
    pub fn finish(self) -> Result<()> {
        match self.children.front() {
            None => Ok(()),
            Some(_) => Err(Error::UnexpectedElement {
                context: self.context,
                remaining: self.children.len(),
            }),
        }
    }
}
