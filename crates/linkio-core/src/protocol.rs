//! Network protocol tags and link addresses
//!
//! Fd-based links carry bare IP packets, so the only classification done
//! at this layer is the version nibble of the first byte.

use core::fmt;

/// IPv4 version nibble
pub const IPV4_VERSION: u8 = 4;

/// IPv6 version nibble
pub const IPV6_VERSION: u8 = 6;

/// Network-layer protocol number (ethertype space)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NetworkProtocol(u16);

impl NetworkProtocol {
    pub const IPV4: NetworkProtocol = NetworkProtocol(0x0800);
    pub const IPV6: NetworkProtocol = NetworkProtocol(0x86dd);

    #[inline]
    pub const fn new(number: u16) -> Self {
        NetworkProtocol(number)
    }

    #[inline]
    pub const fn number(self) -> u16 {
        self.0
    }

    /// Protocol for an IP version nibble, `None` for anything else
    #[inline]
    pub const fn from_ip_version(version: u8) -> Option<Self> {
        match version {
            IPV4_VERSION => Some(NetworkProtocol::IPV4),
            IPV6_VERSION => Some(NetworkProtocol::IPV6),
            _ => None,
        }
    }

    /// Guess the protocol of a raw frame from its first byte
    #[inline]
    pub fn classify(frame: &[u8]) -> Option<Self> {
        ip_version(frame).and_then(Self::from_ip_version)
    }
}

impl fmt::Debug for NetworkProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NetworkProtocol::IPV4 => write!(f, "IPv4"),
            NetworkProtocol::IPV6 => write!(f, "IPv6"),
            NetworkProtocol(n) => write!(f, "NetworkProtocol({:#06x})", n),
        }
    }
}

impl fmt::Display for NetworkProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// High nibble of the first byte; `None` for an empty frame
#[inline]
pub fn ip_version(frame: &[u8]) -> Option<u8> {
    frame.first().map(|b| b >> 4)
}

/// Link-layer address. Fd-based links have none, so they use `EMPTY`.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct LinkAddress(Vec<u8>);

impl LinkAddress {
    pub const EMPTY: LinkAddress = LinkAddress(Vec::new());

    pub fn new(bytes: &[u8]) -> Self {
        LinkAddress(bytes.to_vec())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
