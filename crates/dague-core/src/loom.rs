//! Indirection over `core::sync::atomic` / `core::cell::UnsafeCell` so the
//! same source compiles normally and under `loom`'s model checker in
//! `dev-dependencies` builds.
//!
//! Mirrors the `loom` shim module pattern used throughout the
//! `JonasKruckenberg-k23` pack entry's concurrency crates (`kasync::loom`,
//! `async-exec::scheduler`'s `crate::loom::sync::atomic::*` imports).

#[cfg(loom)]
pub(crate) use loom::sync::atomic;

#[cfg(not(loom))]
pub(crate) mod atomic {
    pub use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
}

#[cfg(loom)]
pub(crate) use loom::cell;

#[cfg(not(loom))]
pub(crate) mod cell {
    /// A `core::cell::UnsafeCell` with loom's `with`/`with_mut` access API,
    /// so callers don't need a second code path for the non-loom build.
    #[derive(Debug)]
    pub(crate) struct UnsafeCell<T>(core::cell::UnsafeCell<T>);

    impl<T> UnsafeCell<T> {
        pub(crate) const fn new(data: T) -> Self {
            Self(core::cell::UnsafeCell::new(data))
        }

        #[inline(always)]
        pub(crate) fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
            f(self.0.get())
        }

        #[inline(always)]
        pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
            f(self.0.get())
        }
    }
}
