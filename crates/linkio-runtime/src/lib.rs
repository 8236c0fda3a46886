//! # linkio-runtime
//!
//! Platform-specific runtime for linkio.
//!
//! This crate provides:
//! - Raw descriptor I/O (non-blocking setup, readv with poll, write/writev)
//! - The tiered receive buffer pool
//! - Fd-based link endpoints with a per-endpoint dispatch thread
//! - An explicit link endpoint registry
//! - Context parking (futex on Linux) and the `Sleeper`/`Waker` pair
//!   built on the commit-sleep slot
//! - A queueing dispatcher that hands packets to a sleeping consumer

pub mod config;
pub mod parking;
pub mod sleep;
pub mod stats;
pub mod registry;
pub mod queue_dispatcher;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        pub mod rawfile;
        pub mod buffer_pool;
        pub mod fdbased;

        pub use buffer_pool::BufferPool;
        pub use fdbased::{FdEndpoint, InjectableEndpoint};
    } else {
        compile_error!("Unsupported platform: fd-based endpoints need a unix descriptor API");
    }
}

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports
pub use config::{ConfigError, EndpointConfig};
pub use parking::{new_parker, ContextParking, PlatformParker};
pub use sleep::{Sleeper, Waker};
pub use stats::EndpointStats;
pub use registry::LinkEndpointRegistry;
pub use queue_dispatcher::{packet_queue, Packet, PacketReceiver, QueueDispatcher};
