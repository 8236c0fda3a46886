//! Context parking
//!
//! Suspends the one context that owns a `Sleeper` until a waker hands it
//! off. Platform-specific implementations use the cheapest primitive
//! available.
//!
//! Parkers carry a single permit, like `std::thread::park`: an `unpark()`
//! that lands before `park()` is not lost, the next `park()` consumes it
//! and returns immediately.

use std::time::Duration;

/// Single-waiter park/unpark with a one-shot permit
pub trait ContextParking: Send + Sync {
    /// Park the calling context until unparked or timeout
    ///
    /// Returns:
    /// - `true` if a permit was consumed
    /// - `false` on timeout or spurious wakeup
    ///
    /// Callers re-check their wake condition either way.
    fn park(&self, timeout: Option<Duration>) -> bool;

    /// Make a permit available and wake the parked context, if any
    fn unpark(&self);
}

// Platform-specific implementations
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexParker as PlatformParker;
    } else {
        mod fallback;
        pub use fallback::CondvarParker as PlatformParker;
    }
}

/// Create a new platform-appropriate parker
pub fn new_parker() -> Box<dyn ContextParking> {
    Box::new(PlatformParker::new())
}
