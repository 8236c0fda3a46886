//! Library defaults for `EndpointConfig`

/// MTU reported by new endpoints
pub const MTU: u32 = linkio_core::constants::DEFAULT_MTU;

/// Dispatch threads are named `<prefix>-nic<id>`
pub const THREAD_NAME_PREFIX: &str = "linkio-rx";

/// Upper bound on one poll() wait inside the blocking read
///
/// Bounds how long a dispatch thread takes to notice that its descriptor
/// was closed underneath it.
pub const POLL_TIMEOUT_MS: u64 = 100;

/// Packets buffered by a `QueueDispatcher` before it starts dropping
pub const QUEUE_CAPACITY: usize = 1024;
