//! Error types for link endpoints

use core::fmt;

/// Result type for link operations
pub type LinkResult<T> = Result<T, LinkError>;

/// Errors that can occur on a link endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// OS error with errno
    Os(i32),

    /// The descriptor was closed underneath the endpoint
    Closed,

    /// The descriptor cannot make progress right now
    WouldBlock,

    /// A dispatcher is already attached
    AlreadyAttached,

    /// Operation needs an attached dispatcher
    NotAttached,

    /// No endpoint registered under the given id
    NotFound,

    /// Configuration rejected
    InvalidConfig(&'static str),
}

impl LinkError {
    /// True for the "descriptor closed" condition
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, LinkError::Closed)
    }

    /// True when the operation should be retried once the fd is ready
    #[inline]
    pub fn is_would_block(&self) -> bool {
        matches!(self, LinkError::WouldBlock)
    }

    /// Raw errno for `Os` errors
    pub fn errno(&self) -> Option<i32> {
        match self {
            LinkError::Os(e) => Some(*e),
            _ => None,
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Os(e) => write!(f, "OS error: errno {}", e),
            LinkError::Closed => write!(f, "descriptor closed"),
            LinkError::WouldBlock => write!(f, "operation would block"),
            LinkError::AlreadyAttached => write!(f, "dispatcher already attached"),
            LinkError::NotAttached => write!(f, "no dispatcher attached"),
            LinkError::NotFound => write!(f, "link endpoint not found"),
            LinkError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for LinkError {}
