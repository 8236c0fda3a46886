//! Fd-based link endpoints
//!
//! `FdEndpoint` moves frames between a boundary-preserving descriptor (a
//! TUN device, a datagram or seqpacket socket) and a `NetworkDispatcher`.
//! `attach` starts one named dispatch thread that owns the endpoint's
//! `BufferPool` and runs until the descriptor reports EOF or an error.
//!
//! Delivery borrows: the dispatcher gets `&VectorisedView` backed by the
//! pool's own buffers and must copy anything it keeps. The buffers are
//! reclaimed as soon as `deliver_network_packet` returns.
//!
//! Stopping: shut down or close the descriptor. A 0-byte read or a closed
//! descriptor is a clean stop (close notification with `None`); any other
//! read error is passed to the notification as `Some(err)`.
//!
//! `InjectableEndpoint` never reads. Inbound packets come from `inject`,
//! which clones the caller's view before delivering it.

use crate::buffer_pool::BufferPool;
use crate::config::EndpointConfig;
use crate::rawfile;
use crate::registry::LinkEndpointRegistry;
use crate::stats::{Counters, EndpointStats};
use linkio_core::error::{LinkError, LinkResult};
use linkio_core::id::LinkEndpointId;
use linkio_core::protocol::{LinkAddress, NetworkProtocol};
use linkio_core::tier::TierConfig;
use linkio_core::traits::{CloseNotify, LinkEndpoint, NetworkDispatcher};
use linkio_core::view::VectorisedView;
use linkio_core::{kdebug, kinfo, ktrace, kwarn};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// State shared between an endpoint handle and its dispatch thread
struct EndpointInner {
    id: LinkEndpointId,
    fd: RawFd,
    mtu: u32,
    poll_timeout: Duration,
    closed: Option<Box<dyn CloseNotify>>,
    stats: Counters,
}

impl EndpointInner {
    /// Write one frame; a descriptor that is not writable drops it
    fn write_packet(&self, hdr: &[u8], payload: Option<&[u8]>) -> LinkResult<()> {
        let res = match payload {
            None => rawfile::non_blocking_write(self.fd, hdr),
            Some(payload) => rawfile::non_blocking_write2(self.fd, hdr, payload),
        };

        match res {
            Ok(_) => {
                self.stats.record_tx();
                Ok(())
            }
            Err(LinkError::WouldBlock) => {
                self.stats.record_tx_drop();
                ktrace!("{}: not writable, dropped frame", self.id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Read, classify and deliver one frame
    ///
    /// Ok(false) on a 0-byte read.
    fn dispatch(&self, pool: &mut BufferPool, dispatcher: &dyn NetworkDispatcher) -> LinkResult<bool> {
        let n = pool.fill(self.fd, Some(self.poll_timeout))?;
        if n == 0 {
            return Ok(false);
        }

        let vv = pool.take(n);
        match vv.first().and_then(|v| NetworkProtocol::classify(v.as_slice())) {
            Some(protocol) => {
                #[cfg(feature = "debug-logging")]
                kdebug!("{}: {} byte {} frame in {} views", self.id, n, protocol, vv.views().len());

                dispatcher.deliver_network_packet(self.id, &LinkAddress::EMPTY, protocol, vv);
                self.stats.record_rx(n);
                pool.release();
            }
            None => {
                ktrace!("{}: discarded {} byte frame with unknown version", self.id, n);
                self.stats.record_discard();
                pool.restore();
            }
        }

        Ok(true)
    }
}

/// Dispatch thread body. Returns the terminal error, `None` for a clean stop.
fn dispatch_loop(
    inner: Arc<EndpointInner>,
    tiers: TierConfig,
    dispatcher: Arc<dyn NetworkDispatcher>,
) -> Option<LinkError> {
    kinfo!("{}: dispatch loop started on fd {}", inner.id, inner.fd);

    let mut pool = BufferPool::new(tiers);
    let err = loop {
        match inner.dispatch(&mut pool, &*dispatcher) {
            Ok(true) => {}
            Ok(false) => {
                kdebug!("{}: end of stream", inner.id);
                break None;
            }
            Err(LinkError::Closed) => {
                kdebug!("{}: descriptor closed", inner.id);
                break None;
            }
            Err(e) => {
                kwarn!("{}: read failed: {}", inner.id, e);
                break Some(e);
            }
        }
    };

    if let Some(closed) = &inner.closed {
        closed.closed(err.clone());
    }

    let stats = inner.stats.snapshot();
    kinfo!(
        "{}: dispatch loop stopped (rx {} packets, {} discarded)",
        inner.id,
        stats.rx_packets,
        stats.rx_discarded
    );
    err
}

/// Endpoint over a readable and writable descriptor
///
/// The descriptor is borrowed: the caller keeps it open for the
/// endpoint's lifetime and closes it afterwards.
pub struct FdEndpoint {
    inner: Arc<EndpointInner>,
    tiers: TierConfig,
    thread_prefix: String,
    attached: AtomicBool,
    worker: Mutex<Option<JoinHandle<Option<LinkError>>>>,
}

impl FdEndpoint {
    /// Build an endpoint for `fd` and put the descriptor in non-blocking mode
    pub fn new(
        id: LinkEndpointId,
        fd: RawFd,
        config: &EndpointConfig,
        closed: Option<Box<dyn CloseNotify>>,
    ) -> LinkResult<Self> {
        config.validate()?;
        rawfile::set_nonblocking(fd)?;

        Ok(FdEndpoint {
            inner: Arc::new(EndpointInner {
                id,
                fd,
                mtu: config.mtu,
                poll_timeout: config.poll_timeout,
                closed,
                stats: Counters::default(),
            }),
            tiers: config.tiers.clone(),
            thread_prefix: config.thread_name_prefix.clone(),
            attached: AtomicBool::new(false),
            worker: Mutex::new(None),
        })
    }

    #[inline]
    pub fn id(&self) -> LinkEndpointId {
        self.inner.id
    }

    #[inline]
    pub fn fd(&self) -> RawFd {
        self.inner.fd
    }

    pub fn stats(&self) -> EndpointStats {
        self.inner.stats.snapshot()
    }

    /// Wait for the dispatch thread to exit and return its terminal error
    ///
    /// Returns `None` at once if the endpoint was never attached or was
    /// already joined. A panic in the dispatcher is re-raised here.
    pub fn join(&self) -> Option<LinkError> {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;

        match handle.join() {
            Ok(err) => err,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// True while the dispatch thread is running
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(false, |h| !h.is_finished())
    }
}

impl LinkEndpoint for FdEndpoint {
    fn mtu(&self) -> u32 {
        self.inner.mtu
    }

    /// No link header
    fn max_header_length(&self) -> u16 {
        0
    }

    fn link_address(&self) -> LinkAddress {
        LinkAddress::EMPTY
    }

    /// Start the dispatch thread. A second attach is rejected.
    fn attach(&self, dispatcher: Arc<dyn NetworkDispatcher>) -> LinkResult<()> {
        if self.attached.swap(true, Ordering::AcqRel) {
            return Err(LinkError::AlreadyAttached);
        }

        let inner = Arc::clone(&self.inner);
        let tiers = self.tiers.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.thread_prefix, self.inner.id))
            .spawn(move || dispatch_loop(inner, tiers, dispatcher));

        match spawned {
            Ok(handle) => {
                *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.attached.store(false, Ordering::Release);
                kwarn!("{}: failed to spawn dispatch thread: {}", self.inner.id, e);
                Err(LinkError::Os(e.raw_os_error().unwrap_or(libc::EAGAIN)))
            }
        }
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    fn write_packet(
        &self,
        hdr: &[u8],
        payload: Option<&[u8]>,
        _protocol: NetworkProtocol,
    ) -> LinkResult<()> {
        self.inner.write_packet(hdr, payload)
    }
}

impl std::fmt::Debug for FdEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FdEndpoint")
            .field("id", &self.inner.id)
            .field("fd", &self.inner.fd)
            .field("mtu", &self.inner.mtu)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Write-only endpoint whose inbound packets are injected
pub struct InjectableEndpoint {
    inner: Arc<EndpointInner>,
    dispatcher: RwLock<Option<Arc<dyn NetworkDispatcher>>>,
}

impl InjectableEndpoint {
    /// Build an injectable endpoint writing to `fd` (set non-blocking)
    pub fn new(id: LinkEndpointId, fd: RawFd, config: &EndpointConfig) -> LinkResult<Self> {
        config.validate()?;
        rawfile::set_nonblocking(fd)?;

        Ok(InjectableEndpoint {
            inner: Arc::new(EndpointInner {
                id,
                fd,
                mtu: config.mtu,
                poll_timeout: config.poll_timeout,
                closed: None,
                stats: Counters::default(),
            }),
            dispatcher: RwLock::new(None),
        })
    }

    #[inline]
    pub fn id(&self) -> LinkEndpointId {
        self.inner.id
    }

    pub fn stats(&self) -> EndpointStats {
        self.inner.stats.snapshot()
    }

    /// Deliver an inbound packet as if it had been read from the descriptor
    ///
    /// `vv` is cloned first; the dispatcher never sees the caller's storage.
    pub fn inject(&self, protocol: NetworkProtocol, vv: &VectorisedView) -> LinkResult<()> {
        let dispatcher = self
            .dispatcher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(LinkError::NotAttached)?;

        let owned = vv.clone();
        dispatcher.deliver_network_packet(self.inner.id, &LinkAddress::EMPTY, protocol, &owned);
        self.inner.stats.record_rx(owned.size());
        Ok(())
    }
}

impl LinkEndpoint for InjectableEndpoint {
    fn mtu(&self) -> u32 {
        self.inner.mtu
    }

    fn max_header_length(&self) -> u16 {
        0
    }

    fn link_address(&self) -> LinkAddress {
        LinkAddress::EMPTY
    }

    /// Store the dispatcher for `inject`; no thread is started. Replaces
    /// any earlier dispatcher.
    fn attach(&self, dispatcher: Arc<dyn NetworkDispatcher>) -> LinkResult<()> {
        *self.dispatcher.write().unwrap_or_else(PoisonError::into_inner) = Some(dispatcher);
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.dispatcher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn write_packet(
        &self,
        hdr: &[u8],
        payload: Option<&[u8]>,
        _protocol: NetworkProtocol,
    ) -> LinkResult<()> {
        self.inner.write_packet(hdr, payload)
    }
}

impl std::fmt::Debug for InjectableEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectableEndpoint")
            .field("id", &self.inner.id)
            .field("fd", &self.inner.fd)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Everything that can reject an endpoint, run before an id is reserved
fn check_fd(fd: RawFd, config: &EndpointConfig) -> LinkResult<()> {
    config.validate()?;
    rawfile::set_nonblocking(fd)
}

/// Create an endpoint for `fd` and register it
pub fn new(
    registry: &LinkEndpointRegistry,
    fd: RawFd,
    config: &EndpointConfig,
    closed: Option<Box<dyn CloseNotify>>,
) -> LinkResult<(LinkEndpointId, Arc<FdEndpoint>)> {
    check_fd(fd, config)?;
    let id = registry.reserve();
    let endpoint = Arc::new(FdEndpoint::new(id, fd, config, closed)?);
    registry.insert(id, Arc::clone(&endpoint) as Arc<dyn LinkEndpoint>);
    Ok((id, endpoint))
}

/// Create an injectable endpoint for `fd` and register it
pub fn new_injectable(
    registry: &LinkEndpointRegistry,
    fd: RawFd,
    config: &EndpointConfig,
) -> LinkResult<(LinkEndpointId, Arc<InjectableEndpoint>)> {
    check_fd(fd, config)?;
    let id = registry.reserve();
    let endpoint = Arc::new(InjectableEndpoint::new(id, fd, config)?);
    registry.insert(id, Arc::clone(&endpoint) as Arc<dyn LinkEndpoint>);
    Ok((id, endpoint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ipv4_frame, ipv6_frame, seqpacket_pair, set_small_sndbuf};
    use linkio_core::traits::FnClose;
    use linkio_core::view::View;
    use std::os::unix::io::{AsRawFd, IntoRawFd};

    struct Delivered {
        endpoint: LinkEndpointId,
        remote: LinkAddress,
        protocol: NetworkProtocol,
        data: Vec<u8>,
        segments: usize,
        first_ptr: usize,
    }

    #[derive(Default)]
    struct Recorder {
        packets: Mutex<Vec<Delivered>>,
    }

    impl NetworkDispatcher for Recorder {
        fn deliver_network_packet(
            &self,
            endpoint: LinkEndpointId,
            remote: &LinkAddress,
            protocol: NetworkProtocol,
            vv: &VectorisedView,
        ) {
            self.packets.lock().unwrap().push(Delivered {
                endpoint,
                remote: remote.clone(),
                protocol,
                data: vv.to_vec(),
                segments: vv.views().len(),
                first_ptr: vv.views()[0].as_slice().as_ptr() as usize,
            });
        }
    }

    fn close_log() -> (Arc<Mutex<Vec<Option<LinkError>>>>, Box<dyn CloseNotify>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let notify: Box<dyn CloseNotify> = Box::new(FnClose(move |err| sink.lock().unwrap().push(err)));
        (log, notify)
    }

    fn test_config() -> EndpointConfig {
        EndpointConfig::new().poll_timeout(Duration::from_millis(10))
    }

    #[test]
    fn test_classify_and_deliver() {
        let (peer, local) = seqpacket_pair();
        let registry = LinkEndpointRegistry::new();
        let (log, notify) = close_log();
        let (id, ep) = new(&registry, local.as_raw_fd(), &test_config(), Some(notify)).unwrap();

        let v4 = ipv4_frame(1000, 0x11);
        let v6 = ipv6_frame(100, 0x22);
        rawfile::non_blocking_write(peer.as_raw_fd(), &v4).unwrap();
        rawfile::non_blocking_write(peer.as_raw_fd(), &[0x20, 1, 2, 3]).unwrap();
        rawfile::non_blocking_write(peer.as_raw_fd(), &[0x50]).unwrap();
        rawfile::non_blocking_write(peer.as_raw_fd(), &v6).unwrap();
        drop(peer);

        let recorder = Arc::new(Recorder::default());
        ep.attach(Arc::clone(&recorder) as Arc<dyn NetworkDispatcher>).unwrap();
        assert_eq!(ep.join(), None);

        let packets = recorder.packets.lock().unwrap();
        assert_eq!(packets.len(), 2);

        assert_eq!(packets[0].endpoint, id);
        assert!(packets[0].remote.is_empty());
        assert_eq!(packets[0].protocol, NetworkProtocol::IPV4);
        assert_eq!(packets[0].data, v4);
        assert_eq!(packets[0].segments, 4);

        assert_eq!(packets[1].protocol, NetworkProtocol::IPV6);
        assert_eq!(packets[1].data, v6);
        assert_eq!(packets[1].segments, 1);

        let stats = ep.stats();
        assert_eq!(stats.rx_packets, 2);
        assert_eq!(stats.rx_bytes, 1100);
        assert_eq!(stats.rx_discarded, 2);
        assert_eq!(*log.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_delivery_preserves_order() {
        let (peer, local) = seqpacket_pair();
        let ep = FdEndpoint::new(LinkEndpointId::new(9), local.as_raw_fd(), &test_config(), None).unwrap();
        let recorder = Arc::new(Recorder::default());
        ep.attach(Arc::clone(&recorder) as Arc<dyn NetworkDispatcher>).unwrap();

        let writer = thread::spawn(move || {
            for i in 0..200u32 {
                let mut frame = ipv4_frame(64 + (i as usize * 37) % 3000, 0);
                frame[1..5].copy_from_slice(&i.to_be_bytes());
                loop {
                    match rawfile::non_blocking_write(peer.as_raw_fd(), &frame) {
                        Ok(_) => break,
                        Err(LinkError::WouldBlock) => {
                            rawfile::blocking_poll(peer.as_raw_fd(), libc::POLLOUT, None).unwrap()
                        }
                        Err(e) => panic!("write failed: {}", e),
                    }
                }
            }
        });
        writer.join().unwrap();
        assert_eq!(ep.join(), None);

        let packets = recorder.packets.lock().unwrap();
        assert_eq!(packets.len(), 200);
        for (i, p) in packets.iter().enumerate() {
            let seq = u32::from_be_bytes([p.data[1], p.data[2], p.data[3], p.data[4]]);
            assert_eq!(seq as usize, i);
            assert_eq!(p.data.len(), 64 + (i * 37) % 3000);
        }
    }

    #[test]
    fn test_read_error_notifies_once() {
        // readv on a directory fails with EISDIR
        let dir = std::fs::File::open("/").unwrap();
        let (log, notify) = close_log();
        let ep = FdEndpoint::new(LinkEndpointId::new(1), dir.as_raw_fd(), &test_config(), Some(notify)).unwrap();
        ep.attach(Arc::new(Recorder::default())).unwrap();

        assert_eq!(ep.join(), Some(LinkError::Os(libc::EISDIR)));
        assert_eq!(*log.lock().unwrap(), vec![Some(LinkError::Os(libc::EISDIR))]);
        assert!(!ep.is_running());
    }

    #[test]
    fn test_shutdown_stops_loop() {
        let (_peer, local) = seqpacket_pair();
        let (log, notify) = close_log();
        let ep = FdEndpoint::new(LinkEndpointId::new(1), local.as_raw_fd(), &test_config(), Some(notify)).unwrap();
        ep.attach(Arc::new(Recorder::default())).unwrap();

        thread::sleep(Duration::from_millis(20));
        assert!(ep.is_running());
        unsafe { libc::shutdown(local.as_raw_fd(), libc::SHUT_RDWR) };

        assert_eq!(ep.join(), None);
        assert_eq!(*log.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_close_fd_stops_loop() {
        let (_peer, local) = seqpacket_pair();
        let fd = local.into_raw_fd();
        let (log, notify) = close_log();
        let ep = FdEndpoint::new(LinkEndpointId::new(1), fd, &test_config(), Some(notify)).unwrap();
        ep.attach(Arc::new(Recorder::default())).unwrap();

        thread::sleep(Duration::from_millis(30));
        assert!(ep.is_running());
        assert_eq!(unsafe { libc::close(fd) }, 0);

        assert_eq!(ep.join(), None);
        assert_eq!(*log.lock().unwrap(), vec![None]);
        assert_eq!(ep.stats().rx_packets, 0);
    }

    #[test]
    fn test_attach_twice_rejected() {
        let (_peer, local) = seqpacket_pair();
        let ep = FdEndpoint::new(LinkEndpointId::new(1), local.as_raw_fd(), &test_config(), None).unwrap();
        assert!(!ep.is_attached());
        ep.attach(Arc::new(Recorder::default())).unwrap();
        assert!(ep.is_attached());
        assert_eq!(
            ep.attach(Arc::new(Recorder::default())),
            Err(LinkError::AlreadyAttached)
        );
        unsafe { libc::shutdown(local.as_raw_fd(), libc::SHUT_RDWR) };
        assert_eq!(ep.join(), None);
    }

    #[test]
    fn test_queries() {
        let (_peer, local) = seqpacket_pair();
        let ep = FdEndpoint::new(LinkEndpointId::new(4), local.as_raw_fd(), &test_config().mtu(9000), None).unwrap();
        assert_eq!(ep.mtu(), 9000);
        assert_eq!(ep.max_header_length(), 0);
        assert!(ep.link_address().is_empty());
        assert_eq!(ep.id(), LinkEndpointId::new(4));
        assert_eq!(ep.join(), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (_peer, local) = seqpacket_pair();
        let res = FdEndpoint::new(LinkEndpointId::new(1), local.as_raw_fd(), &test_config().mtu(0), None);
        assert!(matches!(res, Err(LinkError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejected_endpoint_keeps_ids() {
        let (_peer, local) = seqpacket_pair();
        let registry = LinkEndpointRegistry::new();

        assert!(new(&registry, local.as_raw_fd(), &test_config().mtu(0), None).is_err());
        assert!(new_injectable(&registry, -1, &test_config()).is_err());
        assert!(registry.is_empty());

        let (id, _ep) = new_injectable(&registry, local.as_raw_fd(), &test_config()).unwrap();
        assert_eq!(id, LinkEndpointId::new(1));
    }

    #[test]
    fn test_write_drops_when_not_writable() {
        let (local, _peer) = seqpacket_pair();
        set_small_sndbuf(local.as_raw_fd());
        let ep = FdEndpoint::new(LinkEndpointId::new(1), local.as_raw_fd(), &test_config(), None).unwrap();

        let hdr = ipv4_frame(20, 0);
        let payload = [0xaau8; 1024];
        let mut attempts = 0u64;
        while ep.stats().tx_dropped == 0 && attempts < 10_000 {
            assert_eq!(ep.write_packet(&hdr, Some(&payload), NetworkProtocol::IPV4), Ok(()));
            attempts += 1;
        }

        let stats = ep.stats();
        assert!(stats.tx_dropped > 0, "peer never stopped accepting");
        assert_eq!(stats.tx_packets + stats.tx_dropped, attempts);

        // Still dropping, still no error
        assert_eq!(ep.write_packet(&hdr, None, NetworkProtocol::IPV4), Ok(()));
    }

    #[test]
    fn test_write_reaches_peer() {
        let (local, peer) = seqpacket_pair();
        let ep = FdEndpoint::new(LinkEndpointId::new(1), local.as_raw_fd(), &test_config(), None).unwrap();
        ep.write_packet(b"\x45hdr", Some(b"payload"), NetworkProtocol::IPV4).unwrap();
        ep.write_packet(b"\x60only", None, NetworkProtocol::IPV6).unwrap();

        let mut buf = [0u8; 64];
        let n = unsafe { libc::read(peer.as_raw_fd(), buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        assert_eq!(&buf[..n as usize], b"\x45hdrpayload");
        let n = unsafe { libc::read(peer.as_raw_fd(), buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        assert_eq!(&buf[..n as usize], b"\x60only");
        assert_eq!(ep.stats().tx_packets, 2);
    }

    #[test]
    fn test_write_error_propagates() {
        let (local, peer) = seqpacket_pair();
        let ep = FdEndpoint::new(LinkEndpointId::new(1), local.as_raw_fd(), &test_config(), None).unwrap();
        drop(peer);
        let err = ep.write_packet(b"\x45", None, NetworkProtocol::IPV4).unwrap_err();
        assert_eq!(err, LinkError::Os(libc::EPIPE));
    }

    #[test]
    fn test_inject_clones() {
        let (_peer, local) = seqpacket_pair();
        let registry = LinkEndpointRegistry::new();
        let (id, ep) = new_injectable(&registry, local.as_raw_fd(), &test_config()).unwrap();

        let mut original = VectorisedView::new(vec![View::from(&b"\x45\x00"[..]), View::from(&b"body"[..])]);
        assert_eq!(ep.inject(NetworkProtocol::IPV4, &original), Err(LinkError::NotAttached));

        let recorder = Arc::new(Recorder::default());
        ep.attach(Arc::clone(&recorder) as Arc<dyn NetworkDispatcher>).unwrap();
        assert!(ep.is_attached());
        ep.inject(NetworkProtocol::IPV4, &original).unwrap();

        let original_ptr = original.views()[0].as_slice().as_ptr() as usize;
        original.segment_mut(0).unwrap().copy_from_slice(b"\x60\xff");
        original.segment_mut(1).unwrap().fill(0);
        assert_eq!(original.to_vec(), b"\x60\xff\0\0\0\0");

        let packets = recorder.packets.lock().unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].endpoint, id);
        assert!(packets[0].remote.is_empty());
        assert_eq!(packets[0].data, b"\x45\x00body");
        assert_ne!(packets[0].first_ptr, original_ptr);
        assert_eq!(ep.stats().rx_packets, 1);
        assert_eq!(registry.get(id).map(|e| e.mtu()), Some(1500));
    }
}
