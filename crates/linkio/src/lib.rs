//! # linkio - Link-layer I/O for user-space network stacks
//!
//! The lowest layer of a user-space network stack: endpoints that move raw
//! frames between a boundary-preserving descriptor (TUN device, datagram or
//! seqpacket socket) and the stack's dispatcher, plus the lock-free
//! commit-sleep primitive the stack uses to park and resume contexts.
//!
//! ## Features
//!
//! - **Zero-copy receive**: one readv per frame into size-tiered buffers;
//!   the delivered view aliases the buffers directly
//! - **Drop, don't block**: writes to a descriptor that is not writable
//!   drop the frame and count it
//! - **Injection**: a write-only endpoint variant fed by `inject`
//! - **Commit sleep**: a single atomic word closes the lost-wakeup window
//!   between "about to sleep" and "asleep"
//!
//! ## Quick Start
//!
//! ```ignore
//! use linkio::{EndpointConfig, LinkEndpoint, LinkStack};
//! use std::sync::Arc;
//!
//! fn main() -> linkio::LinkResult<()> {
//!     let stack = LinkStack::new(EndpointConfig::from_env())?;
//!     let (id, ep) = stack.open(tun_fd, None)?;
//!
//!     let (dispatcher, mut rx) = stack.packet_queue();
//!     ep.attach(Arc::new(dispatcher))?;
//!
//!     while let Some(packet) = rx.recv() {
//!         println!("{}: {} bytes of {}", packet.endpoint, packet.data.len(), packet.protocol);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Network stack (dispatcher)                  │
//! │         deliver_network_packet(id, addr, proto, &vv)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                              │ one call per frame
//! ┌─────────────────────────────────────────────────────────────┐
//! │               Dispatch thread (per endpoint)                │
//! │          fill -> cap -> classify -> deliver -> reclaim      │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                              │ readv (one frame)
//!    ┌─────────────────────────────────────────────────────────┐
//!    │                    Buffer pool                          │
//!    │   128 | 256 | 256 | 512 | ... | 32768   (iovec per tier) │
//!    └─────────────────────────────────────────────────────────┘
//! ```

// Re-export core types
pub use linkio_core::{
    BUF_CONFIG,
    CloseNotify,
    Commit,
    ContextToken,
    FnClose,
    LinkAddress,
    LinkEndpoint,
    LinkEndpointId,
    LinkError,
    LinkResult,
    NetworkDispatcher,
    NetworkProtocol,
    SlotState,
    TierConfig,
    VectorisedView,
    View,
    WaitSlot,
    Wake,
};

// Re-export kprint macros for logging
pub use linkio_core::{kerror, kwarn, kinfo, kdebug, ktrace};
pub use linkio_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled};

// Re-export env utilities
pub use linkio_core::{env_get, env_get_bool, env_get_list, env_get_opt};

// Re-export runtime types
pub use linkio_runtime::{
    packet_queue,
    ConfigError,
    EndpointConfig,
    EndpointStats,
    FdEndpoint,
    InjectableEndpoint,
    LinkEndpointRegistry,
    Packet,
    PacketReceiver,
    QueueDispatcher,
    Sleeper,
    Waker,
};

use linkio_runtime::fdbased;
use std::os::unix::io::RawFd;
use std::sync::Arc;

/// A set of endpoints sharing one configuration and one registry
///
/// Owns what the network stack needs to create and address link
/// endpoints. Descriptors stay owned by the caller.
pub struct LinkStack {
    config: EndpointConfig,
    registry: LinkEndpointRegistry,
}

impl LinkStack {
    /// Validate `config` and initialize logging from the environment
    pub fn new(config: EndpointConfig) -> LinkResult<Self> {
        config.validate()?;
        linkio_core::kprint::init();

        Ok(Self {
            config,
            registry: LinkEndpointRegistry::new(),
        })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn registry(&self) -> &LinkEndpointRegistry {
        &self.registry
    }

    /// Create and register an endpoint reading and writing `fd`
    ///
    /// Nothing is read until the endpoint is attached.
    pub fn open(
        &self,
        fd: RawFd,
        closed: Option<Box<dyn CloseNotify>>,
    ) -> LinkResult<(LinkEndpointId, Arc<FdEndpoint>)> {
        let (id, ep) = fdbased::new(&self.registry, fd, &self.config, closed)?;
        kinfo!("{}: opened on fd {} (mtu {})", id, fd, self.config.mtu);
        Ok((id, ep))
    }

    /// Create and register a write-only endpoint fed by `inject`
    pub fn open_injectable(&self, fd: RawFd) -> LinkResult<(LinkEndpointId, Arc<InjectableEndpoint>)> {
        let (id, ep) = fdbased::new_injectable(&self.registry, fd, &self.config)?;
        kinfo!("{}: opened injectable on fd {}", id, fd);
        Ok((id, ep))
    }

    pub fn endpoint(&self, id: LinkEndpointId) -> Option<Arc<dyn LinkEndpoint>> {
        self.registry.get(id)
    }

    /// Forget an endpoint. Its dispatch thread keeps running until the
    /// descriptor is shut down or closed.
    pub fn remove(&self, id: LinkEndpointId) -> LinkResult<()> {
        self.registry.unregister(id).map(|_| ())
    }

    /// Dispatcher/receiver pair sized by `queue_capacity`
    pub fn packet_queue(&self) -> (QueueDispatcher, PacketReceiver) {
        packet_queue(self.config.queue_capacity)
    }
}

impl std::fmt::Debug for LinkStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStack")
            .field("mtu", &self.config.mtu)
            .field("endpoints", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd};
    use std::sync::Mutex;
    use std::time::Duration;

    fn seqpacket_pair() -> (OwnedFd, OwnedFd) {
        let mut fds = [0 as libc::c_int; 2];
        let ret = unsafe {
            libc::socketpair(libc::AF_UNIX, libc::SOCK_SEQPACKET | libc::SOCK_CLOEXEC, 0, fds.as_mut_ptr())
        };
        assert_eq!(ret, 0);
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) }
    }

    fn send(fd: &OwnedFd, frame: &[u8]) {
        let n = unsafe { libc::write(fd.as_raw_fd(), frame.as_ptr() as *const libc::c_void, frame.len()) };
        assert_eq!(n, frame.len() as isize);
    }

    fn stack() -> LinkStack {
        LinkStack::new(EndpointConfig::new().poll_timeout(Duration::from_millis(10)).queue_capacity(64)).unwrap()
    }

    #[test]
    fn test_endpoint_to_queue() {
        let stack = stack();
        let (peer, local) = seqpacket_pair();

        let closes = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&closes);
        let notify: Box<dyn CloseNotify> = Box::new(FnClose(move |err: Option<LinkError>| {
            assert!(err.is_none());
            *counter.lock().unwrap() += 1;
        }));

        let (id, ep) = stack.open(local.as_raw_fd(), Some(notify)).unwrap();
        let (dispatcher, mut rx) = stack.packet_queue();
        ep.attach(Arc::new(dispatcher)).unwrap();

        send(&peer, &[0x45, 1, 2, 3]);
        send(&peer, &[0x00, 9]);
        send(&peer, &[0x60, 4, 5]);
        drop(peer);

        let first = rx.recv().unwrap();
        assert_eq!(first.endpoint, id);
        assert_eq!(first.protocol, NetworkProtocol::IPV4);
        assert_eq!(first.data.as_slice(), &[0x45, 1, 2, 3]);

        let second = rx.recv().unwrap();
        assert_eq!(second.protocol, NetworkProtocol::IPV6);
        assert_eq!(second.data.as_slice(), &[0x60, 4, 5]);

        assert_eq!(ep.join(), None);
        assert_eq!(*closes.lock().unwrap(), 1);
        assert_eq!(ep.stats().rx_discarded, 1);

        // The dispatch thread held the only dispatcher; it is gone now
        assert!(rx.recv().is_none());
    }

    #[test]
    fn test_registry_addressing() {
        let stack = stack();
        let (_a, b) = seqpacket_pair();
        let (_c, d) = seqpacket_pair();

        let (id1, _) = stack.open(b.as_raw_fd(), None).unwrap();
        let (id2, inj) = stack.open_injectable(d.as_raw_fd()).unwrap();
        assert_ne!(id1, id2);
        assert_eq!(stack.registry().len(), 2);

        let ep = stack.endpoint(id2).unwrap();
        assert_eq!(ep.mtu(), 1500);
        let (dispatcher, mut rx) = stack.packet_queue();
        ep.attach(Arc::new(dispatcher)).unwrap();
        inj.inject(NetworkProtocol::IPV6, &VectorisedView::from_vec(vec![0x60, 0])).unwrap();
        assert_eq!(rx.try_recv().map(|p| p.endpoint), Some(id2));

        stack.remove(id1).unwrap();
        assert!(stack.endpoint(id1).is_none());
        assert_eq!(stack.remove(id1), Err(LinkError::NotFound));
    }

    #[test]
    fn test_invalid_config() {
        assert!(LinkStack::new(EndpointConfig::new().mtu(0)).is_err());
    }
}
