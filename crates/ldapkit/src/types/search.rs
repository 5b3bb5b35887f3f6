//! Enumerations carried by search and modify requests.

use crate::{Error, Result};

/// Scope of a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchScope {
    /// Only the base object.
    BaseObject,
    /// Immediate children of the base object.
    SingleLevel,
    /// The base object and all its descendants.
    #[default]
    WholeSubtree,
}

/// Alias dereferencing policy of a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DerefAliases {
    /// Never dereference.
    #[default]
    Never,
    /// Dereference while searching below the base.
    InSearching,
    /// Dereference when locating the base object.
    FindingBaseObject,
    /// Always dereference.
    Always,
}

/// Kind of change in a modify request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifyOperation {
    /// Add values.
    Add,
    /// Delete values, or the whole attribute if no values are given.
    Delete,
    /// Replace all values.
    Replace,
}

fn unknown(context: &'static str, value: i64) -> Error {
    Error::decode(context, format!("unknown enumeration value {value}"))
}

impl SearchScope {
    /// Wire value.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::BaseObject => 0,
            Self::SingleLevel => 1,
            Self::WholeSubtree => 2,
        }
    }

    /// Parses a wire value.
    pub fn from_code(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::BaseObject),
            1 => Ok(Self::SingleLevel),
            2 => Ok(Self::WholeSubtree),
            other => Err(unknown("SearchRequest.scope", other)),
        }
    }
}

impl DerefAliases {
    /// Wire value.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Never => 0,
            Self::InSearching => 1,
            Self::FindingBaseObject => 2,
            Self::Always => 3,
        }
    }

    /// Parses a wire value.
    pub fn from_code(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::Never),
            1 => Ok(Self::InSearching),
            2 => Ok(Self::FindingBaseObject),
            3 => Ok(Self::Always),
            other => Err(unknown("SearchRequest.derefAliases", other)),
        }
    }
}

impl ModifyOperation {
    /// Wire value.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Add => 0,
            Self::Delete => 1,
            Self::Replace => 2,
        }
    }

    /// Parses a wire value.
    pub fn from_code(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::Add),
            1 => Ok(Self::Delete),
            2 => Ok(Self::Replace),
            other => Err(unknown("ModifyRequest.operation", other)),
        }
    }
}
