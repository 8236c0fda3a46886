//! Linux futex-based context parking
//!
//! Futex word semantics:
//! - 0 = no permit
//! - 1 = permit available
//!
//! park: consume the permit if present, otherwise FUTEX_WAIT on 0 and
//! try to consume it again on return.
//! unpark: store 1, then FUTEX_WAKE one waiter.

use super::ContextParking;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

const EMPTY: u32 = 0;
const NOTIFIED: u32 = 1;

/// Linux futex-based parker
pub struct FutexParker {
    futex: AtomicU32,
}

impl FutexParker {
    pub fn new() -> Self {
        Self {
            futex: AtomicU32::new(EMPTY),
        }
    }

    #[inline]
    fn try_consume(&self) -> bool {
        self.futex.swap(EMPTY, Ordering::Acquire) == NOTIFIED
    }
}

impl Default for FutexParker {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextParking for FutexParker {
    fn park(&self, timeout: Option<Duration>) -> bool {
        if self.try_consume() {
            return true;
        }

        let timespec = timeout.map(|d| libc::timespec {
            tv_sec: d.as_secs() as libc::time_t,
            tv_nsec: d.subsec_nanos() as libc::c_long,
        });
        let timespec_ptr = match &timespec {
            Some(ts) => ts as *const libc::timespec,
            None => std::ptr::null(),
        };

        // FUTEX_WAIT: sleep only while the word is still EMPTY. ETIMEDOUT,
        // EAGAIN (word changed) and EINTR all fall through to the re-check.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                EMPTY,
                timespec_ptr,
                std::ptr::null::<u32>(),
                0u32,
            );
        }

        self.try_consume()
    }

    fn unpark(&self) {
        if self.futex.swap(NOTIFIED, Ordering::Release) == NOTIFIED {
            // Permit already pending; the waiter has been or will be woken
            return;
        }

        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                1i32,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }
}
