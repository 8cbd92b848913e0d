//! A one-shot startup barrier for `flow_init`.
//!
//! `spec.md` §4.2 requires that "all EUs wait on `barrier` before
//! proceeding so that shared objects initialized by EU-0 are visible" —
//! a classic single-use rendezvous, not a reusable cyclic barrier. This
//! is a spin-wait generation counter in the same style as [`SpinLock`]:
//! no blocking primitive, so it stays usable from a `no_std` build.
//!
//! [`SpinLock`]: crate::sync::SpinLock

use crate::loom::atomic::{AtomicUsize, Ordering};

/// A barrier that releases all waiters once `arrive` has been called
/// `count` times.
pub struct Barrier {
    count: usize,
    arrived: AtomicUsize,
}

impl Barrier {
    /// Creates a barrier for `count` participants.
    #[must_use]
    #[cfg(not(loom))]
    pub const fn new(count: usize) -> Self {
        Self {
            count,
            arrived: AtomicUsize::new(0),
        }
    }

    /// Creates a barrier for `count` participants.
    ///
    /// Not `const` under `loom`; see [`SpinLock::new`](crate::sync::SpinLock::new).
    #[must_use]
    #[cfg(loom)]
    pub fn new(count: usize) -> Self {
        Self {
            count,
            arrived: AtomicUsize::new(0),
        }
    }

    /// Marks this participant as arrived and spins until every participant
    /// has also arrived.
    pub fn arrive_and_wait(&self) {
        if self.count <= 1 {
            return;
        }

        self.arrived.fetch_add(1, Ordering::Release);
        while self.arrived.load(Ordering::Acquire) < self.count {
            core::hint::spin_loop();
        }
    }
}
