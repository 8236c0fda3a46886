//! Sleeper / Waker
//!
//! A `Sleeper` lets one context wait for any of several wake sources. Each
//! source holds a `Waker` registered with a caller-chosen id. Asserting a
//! waker makes its id fetchable and resumes the sleeper if it is parked.
//!
//! Blocking is built on `WaitSlot`: the sleeper prepares the slot,
//! re-scans its wakers, commits its token and only then parks. A waker
//! always asserts before it touches the slot, so a wake that races the
//! commit either shows up in the re-scan or aborts the commit.

use crate::parking::{new_parker, ContextParking};
use linkio_core::commit::{Commit, WaitSlot, Wake};
use linkio_core::id::ContextToken;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

struct SleeperShared {
    slot: WaitSlot,
    parker: Box<dyn ContextParking>,
}

impl SleeperShared {
    /// Waker side: take the slot and resume whoever committed to it
    fn notify(&self) {
        if let Wake::Resume(_) = self.slot.wake() {
            self.parker.unpark();
        }
    }
}

struct WakerInner {
    id: usize,
    asserted: AtomicBool,
    sleeper: Weak<SleeperShared>,
}

/// Wake source bound to one `Sleeper`
///
/// Cheap to clone; clones share the asserted flag.
#[derive(Clone)]
pub struct Waker {
    inner: Arc<WakerInner>,
}

impl Waker {
    /// Assert the waker. Notifies the sleeper if this assert is new.
    pub fn assert(&self) {
        if self.inner.asserted.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(sleeper) = self.inner.sleeper.upgrade() {
            sleeper.notify();
        }
    }

    /// Withdraw a pending assert
    pub fn clear(&self) {
        self.inner.asserted.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_asserted(&self) -> bool {
        self.inner.asserted.load(Ordering::Acquire)
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.inner.id
    }
}

impl std::fmt::Debug for Waker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waker")
            .field("id", &self.inner.id)
            .field("asserted", &self.is_asserted())
            .finish()
    }
}

/// Single-owner multi-source sleeper
///
/// `fetch` takes `&mut self`: exactly one context waits on a sleeper.
pub struct Sleeper {
    shared: Arc<SleeperShared>,
    token: ContextToken,
    wakers: Vec<Arc<WakerInner>>,
}

impl Sleeper {
    pub fn new() -> Self {
        Self::with_parker(new_parker())
    }

    pub fn with_parker(parker: Box<dyn ContextParking>) -> Self {
        Sleeper {
            shared: Arc::new(SleeperShared {
                slot: WaitSlot::new(),
                parker,
            }),
            token: ContextToken::next(),
            wakers: Vec::new(),
        }
    }

    /// Identity published in the slot while parked
    #[inline]
    pub fn token(&self) -> ContextToken {
        self.token
    }

    /// Register a new wake source; `fetch` reports it as `id`
    pub fn add_waker(&mut self, id: usize) -> Waker {
        let inner = Arc::new(WakerInner {
            id,
            asserted: AtomicBool::new(false),
            sleeper: Arc::downgrade(&self.shared),
        });
        self.wakers.push(Arc::clone(&inner));
        Waker { inner }
    }

    /// Id of an asserted waker, clearing it
    ///
    /// With `block` false this never waits and returns `None` if nothing
    /// is asserted. With `block` true it waits until something is.
    pub fn fetch(&mut self, block: bool) -> Option<usize> {
        loop {
            if let Some(id) = self.take_asserted() {
                return Some(id);
            }
            if !block {
                return None;
            }
            self.wait(None);
        }
    }

    /// Like `fetch(true)` but gives up after `timeout`
    pub fn fetch_timeout(&mut self, timeout: Duration) -> Option<usize> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(id) = self.take_asserted() {
                return Some(id);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.wait(Some(deadline - now));
        }
    }

    fn take_asserted(&self) -> Option<usize> {
        self.wakers
            .iter()
            .find(|w| w.asserted.swap(false, Ordering::AcqRel))
            .map(|w| w.id)
    }

    fn any_asserted(&self) -> bool {
        self.wakers.iter().any(|w| w.asserted.load(Ordering::SeqCst))
    }

    /// One prepare/commit/park round. Returns without parking if a wake
    /// is already pending.
    fn wait(&self, timeout: Option<Duration>) {
        let slot = &self.shared.slot;

        slot.prepare();
        if self.any_asserted() {
            slot.cancel();
            return;
        }

        match slot.commit(self.token) {
            Commit::Aborted => {}
            Commit::Committed => {
                self.shared.parker.park(timeout);
                // Timed out or spurious: take the token back. If a waker
                // already swapped it out, its unpark leaves a permit behind,
                // which only costs one extra loop later.
                slot.retract(self.token);
            }
        }
    }
}

impl Default for Sleeper {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Sleeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sleeper")
            .field("token", &self.token)
            .field("wakers", &self.wakers.len())
            .field("slot", &self.shared.slot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fetch_non_blocking() {
        let mut s = Sleeper::new();
        let w = s.add_waker(3);
        assert_eq!(s.fetch(false), None);

        w.assert();
        assert!(w.is_asserted());
        assert_eq!(s.fetch(false), Some(3));
        assert!(!w.is_asserted());
        assert_eq!(s.fetch(false), None);
    }

    #[test]
    fn test_clear_withdraws() {
        let mut s = Sleeper::new();
        let w = s.add_waker(1);
        w.assert();
        w.clear();
        assert_eq!(s.fetch(false), None);
    }

    #[test]
    fn test_fetch_timeout_expires() {
        let mut s = Sleeper::new();
        let _w = s.add_waker(1);
        let start = Instant::now();
        assert_eq!(s.fetch_timeout(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_cross_thread_wake() {
        let mut s = Sleeper::new();
        let w = s.add_waker(7);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            w.assert();
        });

        assert_eq!(s.fetch(true), Some(7));
        handle.join().unwrap();
    }

    #[test]
    fn test_waker_outlives_sleeper() {
        let mut s = Sleeper::new();
        let w = s.add_waker(1);
        drop(s);
        w.assert();
        assert!(w.is_asserted());
    }

    #[test]
    fn test_no_lost_wakeups() {
        const ROUNDS: usize = 2_000;

        let mut s = Sleeper::new();
        let ping = s.add_waker(0);

        let mut back = Sleeper::new();
        let pong = back.add_waker(0);

        let handle = thread::spawn(move || {
            for _ in 0..ROUNDS {
                assert_eq!(back.fetch(true), Some(0));
                ping.assert();
            }
        });

        for _ in 0..ROUNDS {
            pong.assert();
            assert_eq!(s.fetch(true), Some(0));
        }
        handle.join().unwrap();
    }
}
