//! Fallback parking using std::sync::Condvar
//!
//! Used on platforms without futex support.
//! Less efficient but portable.

use super::ContextParking;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Condvar-based parker (fallback)
pub struct CondvarParker {
    /// bool = permit available
    permit: Mutex<bool>,
    condvar: Condvar,
}

impl CondvarParker {
    pub fn new() -> Self {
        Self {
            permit: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }
}

impl Default for CondvarParker {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextParking for CondvarParker {
    fn park(&self, timeout: Option<Duration>) -> bool {
        let mut guard = self.permit.lock().unwrap_or_else(PoisonError::into_inner);

        if !*guard {
            guard = match timeout {
                Some(t) => {
                    self.condvar
                        .wait_timeout(guard, t)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self.condvar.wait(guard).unwrap_or_else(PoisonError::into_inner),
            };
        }

        std::mem::replace(&mut *guard, false)
    }

    fn unpark(&self) {
        {
            let mut guard = self.permit.lock().unwrap_or_else(PoisonError::into_inner);
            *guard = true;
        }
        self.condvar.notify_one();
    }
}
