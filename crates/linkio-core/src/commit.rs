//! Commit-sleep: single-slot wait/wake handoff
//!
//! One waiting context and any number of wakers share one atomic word:
//!
//! ```text
//!   EMPTY (0) ──prepare──▶ PREPARING (1) ──commit(token)──▶ token (>= 2)
//!       ▲                       │                               │
//!       └──── wake / cancel ────┘◀────────── wake / retract ─────┘
//! ```
//!
//! The waiter announces intent with `prepare`, re-checks its wake
//! condition, then `commit`s its token. A waker that arrives between the
//! two resets the slot to EMPTY, which makes the commit fail: the wait is
//! aborted instead of the wake being lost. A waker that arrives after the
//! commit swaps the token out and owns the job of resuming that context.
//!
//! The slot never blocks. Whether and how the committed context actually
//! suspends is up to the caller (see `Sleeper` in linkio-runtime).
//!
//! # Memory ordering
//!
//! - `prepare` and `wake` are `SeqCst`. The waiter does "store PREPARING,
//!   then load wake condition" while a waker does "store wake condition,
//!   then swap slot". Both are store-then-load across two locations, which
//!   needs a single total order: at least one side must see the other.
//! - `commit` is an `AcqRel` CAS. Release publishes everything the waiter
//!   did before parking to the waker that later swaps the token out;
//!   the `Acquire` load on the abort path pairs with the waker's swap.
//! - `cancel` and `retract` are `AcqRel` CASes that only ever move the
//!   waiter's own state back to EMPTY.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::id::ContextToken;

/// No context waiting
pub const EMPTY: usize = 0;

/// A context announced intent to wait but has not committed
pub const PREPARING: usize = 1;

/// Decoded slot value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Preparing,
    Committed(ContextToken),
}

/// Outcome of a commit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Token published; the caller may suspend
    Committed,
    /// A waker got there first (or the slot is not ours). Do not sleep,
    /// re-check the wake condition.
    Aborted,
}

/// Outcome of a wake attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Nobody was waiting
    Idle,
    /// A wait was being prepared; it will now abort its commit
    AbortedWait,
    /// A context was parked. The caller owns resuming it.
    Resume(ContextToken),
}

/// The shared slot
#[repr(align(64))]
pub struct WaitSlot {
    word: AtomicUsize,
}

impl WaitSlot {
    pub const fn new() -> Self {
        WaitSlot {
            word: AtomicUsize::new(EMPTY),
        }
    }

    /// Current state (a snapshot; may be stale by the time it is used)
    #[inline]
    pub fn state(&self) -> SlotState {
        decode(self.word.load(Ordering::Acquire))
    }

    /// Waiter: EMPTY -> PREPARING
    ///
    /// Must be followed by a re-check of the wake condition before
    /// `commit`; that re-check is what closes the lost-wakeup window.
    #[inline]
    pub fn prepare(&self) {
        let prev = self.word.swap(PREPARING, Ordering::SeqCst);
        debug_assert!(
            prev == EMPTY || prev == PREPARING,
            "prepare on a committed slot"
        );
    }

    /// Waiter: PREPARING -> token
    ///
    /// Fails (`Aborted`) if a waker reset the slot to EMPTY after
    /// `prepare`, or if another token already holds the slot.
    pub fn commit(&self, token: ContextToken) -> Commit {
        loop {
            match self.word.load(Ordering::Acquire) {
                PREPARING => {}
                _ => return Commit::Aborted,
            }

            match self.word.compare_exchange_weak(
                PREPARING,
                token.as_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Commit::Committed,
                Err(_) => continue, // spurious or raced; re-check
            }
        }
    }

    /// Waiter: PREPARING -> EMPTY, after deciding not to sleep
    ///
    /// Returns false if a waker already reset the slot.
    #[inline]
    pub fn cancel(&self) -> bool {
        self.word
            .compare_exchange(PREPARING, EMPTY, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Waiter: token -> EMPTY, after resuming without being woken
    /// (timeout or spurious return from the parker)
    ///
    /// Returns false if a waker already took the token, in which case a
    /// resume for this context is in flight.
    #[inline]
    pub fn retract(&self, token: ContextToken) -> bool {
        self.word
            .compare_exchange(token.as_raw(), EMPTY, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Waker: any -> EMPTY
    ///
    /// The swap is the hand-off: of several concurrent wakers exactly one
    /// observes `Resume(token)` for a given commit.
    #[inline]
    pub fn wake(&self) -> Wake {
        match decode(self.word.swap(EMPTY, Ordering::SeqCst)) {
            SlotState::Empty => Wake::Idle,
            SlotState::Preparing => Wake::AbortedWait,
            SlotState::Committed(token) => Wake::Resume(token),
        }
    }
}

impl Default for WaitSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WaitSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WaitSlot").field(&self.state()).finish()
    }
}

#[inline]
fn decode(raw: usize) -> SlotState {
    match ContextToken::from_raw(raw) {
        Some(token) => SlotState::Committed(token),
        None if raw == PREPARING => SlotState::Preparing,
        None => SlotState::Empty,
    }
}
