//! Link endpoint identifiers and waiter tokens

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::constants::ENDPOINT_NONE;

/// Opaque identifier handed out by the endpoint registry
///
/// Upper layers address a link endpoint through this value. The maximum
/// value (u32::MAX) is reserved as a sentinel for "no endpoint".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct LinkEndpointId(u32);

impl LinkEndpointId {
    /// Sentinel value indicating no endpoint
    pub const NONE: LinkEndpointId = LinkEndpointId(ENDPOINT_NONE);

    #[inline]
    pub const fn new(id: u32) -> Self {
        LinkEndpointId(id)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == ENDPOINT_NONE
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != ENDPOINT_NONE
    }
}

impl From<u32> for LinkEndpointId {
    #[inline]
    fn from(id: u32) -> Self {
        LinkEndpointId(id)
    }
}

impl From<LinkEndpointId> for u32 {
    #[inline]
    fn from(id: LinkEndpointId) -> Self {
        id.0
    }
}

impl fmt::Debug for LinkEndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "LinkEndpointId(NONE)")
        } else {
            write!(f, "LinkEndpointId({})", self.0)
        }
    }
}

impl fmt::Display for LinkEndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "nic{}", self.0)
        }
    }
}

impl Default for LinkEndpointId {
    fn default() -> Self {
        LinkEndpointId::NONE
    }
}

/// Identity a parked context publishes in a `WaitSlot`
///
/// Raw values 0 and 1 are the slot's EMPTY and PREPARING sentinels, so a
/// token is always >= 2.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ContextToken(usize);

/// First raw value usable as a token
pub const FIRST_TOKEN: usize = 2;

static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(FIRST_TOKEN);

impl ContextToken {
    /// Allocate a fresh token, unique for the life of the process
    pub fn next() -> Self {
        ContextToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Build a token from a raw value. Returns `None` for the sentinels.
    #[inline]
    pub const fn from_raw(raw: usize) -> Option<Self> {
        if raw < FIRST_TOKEN {
            None
        } else {
            Some(ContextToken(raw))
        }
    }

    #[inline]
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ContextToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextToken({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_id_basics() {
        let id = LinkEndpointId::new(7);
        assert_eq!(id.as_u32(), 7);
        assert!(id.is_some());
        assert_eq!(format!("{}", id), "nic7");
        assert!(LinkEndpointId::default().is_none());
    }

    #[test]
    fn test_token_never_sentinel() {
        assert!(ContextToken::from_raw(0).is_none());
        assert!(ContextToken::from_raw(1).is_none());
        assert_eq!(ContextToken::from_raw(2).map(|t| t.as_raw()), Some(2));

        let a = ContextToken::next();
        let b = ContextToken::next();
        assert!(a.as_raw() >= FIRST_TOKEN);
        assert_ne!(a, b);
    }
}
