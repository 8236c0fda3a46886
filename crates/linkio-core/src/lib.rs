//! # linkio-core
//!
//! Core types and traits for linkio, the link layer of a user-space
//! network stack.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Descriptor I/O, parking and the dispatch loop live in `linkio-runtime`.
//!
//! ## Modules
//!
//! - `id` - Link endpoint identifiers and waiter tokens
//! - `view` - Owned byte views and vectorised (scatter-gather) views
//! - `protocol` - Network protocol tags and link addresses
//! - `tier` - Size-tier configuration for receive buffers
//! - `traits` - Dispatcher, close notification and link endpoint traits
//! - `commit` - Single-slot commit-sleep primitive
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod view;
pub mod protocol;
pub mod tier;
pub mod traits;
pub mod commit;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::{ContextToken, LinkEndpointId};
pub use view::{VectorisedView, View};
pub use protocol::{LinkAddress, NetworkProtocol};
pub use tier::{TierConfig, BUF_CONFIG};
pub use traits::{CloseNotify, FnClose, LinkEndpoint, NetworkDispatcher};
pub use commit::{Commit, SlotState, WaitSlot, Wake};
pub use error::{LinkError, LinkResult};
pub use env::{env_get, env_get_bool, env_get_list, env_get_opt};

/// Constants shared by every endpoint
pub mod constants {
    /// Largest IP packet representable by a 16-bit total length field
    pub const MAX_IP_PACKET_SIZE: usize = 65535;

    /// Default MTU for new endpoints
    pub const DEFAULT_MTU: u32 = 1500;

    /// Sentinel for "no endpoint"
    pub const ENDPOINT_NONE: u32 = u32::MAX;
}
