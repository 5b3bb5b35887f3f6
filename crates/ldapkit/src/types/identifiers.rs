//! Message identifiers.

use std::sync::atomic::{AtomicI32, Ordering};

/// LDAP message identifier.
///
/// Values range over `0..=i32::MAX`. Zero is reserved for unsolicited
/// notifications sent by the server; requests always carry a positive id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageId(i32);

impl MessageId {
    /// Identifier of unsolicited notifications.
    pub const UNSOLICITED: Self = Self(0);

    /// Creates a message identifier.
    ///
    /// Returns `None` if the value is negative.
    #[must_use]
    pub const fn new(id: i32) -> Option<Self> {
        if id < 0 { None } else { Some(Self(id)) }
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Returns `true` for the unsolicited notification identifier.
    #[must_use]
    pub const fn is_unsolicited(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generator of request message identifiers.
///
/// Hands out 1, 2, 3, ... and wraps from `i32::MAX` back to 1, never
/// producing zero.
#[derive(Debug)]
pub struct MessageIdGenerator {
    counter: AtomicI32,
}

const fn successor(n: i32) -> i32 {
    if n == i32::MAX { 1 } else { n + 1 }
}

impl MessageIdGenerator {
    /// Creates a generator whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicI32::new(0),
        }
    }

    /// Returns the next identifier.
    pub fn next(&self) -> MessageId {
        let previous = match self
            .counter
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(successor(n)))
        {
            Ok(n) | Err(n) => n,
        };
        MessageId(successor(previous))
    }

    /// Returns the most recently issued value, or 0 before the first call.
    #[must_use]
    pub fn current(&self) -> i32 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
