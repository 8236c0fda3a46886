//! Queueing dispatcher
//!
//! Bridges an endpoint's dispatch thread to a consumer that sleeps. The
//! dispatcher copies each delivered view into an owned `Packet`, pushes it
//! into a bounded lock-free queue and asserts a `Waker`. The receiver pops
//! packets and parks on its `Sleeper` while the queue is empty.
//!
//! A full queue drops the packet; the dispatch thread never blocks.

use crate::sleep::{Sleeper, Waker};
use crossbeam_queue::ArrayQueue;
use linkio_core::id::LinkEndpointId;
use linkio_core::kdebug;
use linkio_core::protocol::{LinkAddress, NetworkProtocol};
use linkio_core::traits::NetworkDispatcher;
use linkio_core::view::{VectorisedView, View};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Waker id used by the receiver's sleeper
const PACKET_READY: usize = 0;

/// An inbound packet with owned storage
#[derive(Debug, Clone)]
pub struct Packet {
    pub endpoint: LinkEndpointId,
    pub protocol: NetworkProtocol,
    pub remote: LinkAddress,
    pub data: View,
}

struct Shared {
    queue: ArrayQueue<Packet>,
    delivered: AtomicU64,
    dropped: AtomicU64,
    disconnected: AtomicBool,
}

/// Producer half: a `NetworkDispatcher` that enqueues
pub struct QueueDispatcher {
    shared: Arc<Shared>,
    waker: Waker,
}

/// Consumer half
pub struct PacketReceiver {
    shared: Arc<Shared>,
    sleeper: Sleeper,
}

/// Create a dispatcher/receiver pair holding at most `capacity` packets
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn packet_queue(capacity: usize) -> (QueueDispatcher, PacketReceiver) {
    let shared = Arc::new(Shared {
        queue: ArrayQueue::new(capacity),
        delivered: AtomicU64::new(0),
        dropped: AtomicU64::new(0),
        disconnected: AtomicBool::new(false),
    });

    let mut sleeper = Sleeper::new();
    let waker = sleeper.add_waker(PACKET_READY);

    (
        QueueDispatcher {
            shared: Arc::clone(&shared),
            waker,
        },
        PacketReceiver { shared, sleeper },
    )
}

impl QueueDispatcher {
    /// Packets accepted into the queue
    pub fn delivered(&self) -> u64 {
        self.shared.delivered.load(Ordering::Relaxed)
    }

    /// Packets dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl NetworkDispatcher for QueueDispatcher {
    fn deliver_network_packet(
        &self,
        endpoint: LinkEndpointId,
        remote: &LinkAddress,
        protocol: NetworkProtocol,
        vv: &VectorisedView,
    ) {
        let packet = Packet {
            endpoint,
            protocol,
            remote: remote.clone(),
            data: vv.to_view(),
        };

        match self.shared.queue.push(packet) {
            Ok(()) => {
                self.shared.delivered.fetch_add(1, Ordering::Relaxed);
                self.waker.assert();
            }
            Err(p) => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                kdebug!("{}: queue full, dropped {} byte {} packet", endpoint, p.data.len(), protocol);
            }
        }
    }
}

impl Drop for QueueDispatcher {
    fn drop(&mut self) {
        self.shared.disconnected.store(true, Ordering::Release);
        self.waker.assert();
    }
}

impl PacketReceiver {
    /// Next packet, waiting while the queue is empty
    ///
    /// Returns `None` once the dispatcher is gone and the queue drained.
    pub fn recv(&mut self) -> Option<Packet> {
        loop {
            if let Some(p) = self.shared.queue.pop() {
                return Some(p);
            }
            if self.is_disconnected() {
                return self.shared.queue.pop();
            }
            self.sleeper.fetch(true);
        }
    }

    /// Next packet if one is queued; never waits
    pub fn try_recv(&mut self) -> Option<Packet> {
        self.shared.queue.pop()
    }

    /// Like `recv` but gives up after `timeout`
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Packet> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(p) = self.shared.queue.pop() {
                return Some(p);
            }
            if self.is_disconnected() {
                return self.shared.queue.pop();
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.sleeper.fetch_timeout(deadline - now);
        }
    }

    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    /// True once the dispatcher has been dropped
    pub fn is_disconnected(&self) -> bool {
        self.shared.disconnected.load(Ordering::Acquire)
    }

    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for PacketReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketReceiver")
            .field("queued", &self.len())
            .field("capacity", &self.capacity())
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}
