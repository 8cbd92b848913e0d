//! Fixed-size, install-then-read-only per-resource storage.
//!
//! Every strategy needs a flat array of per-VP or per-EU state, sized once
//! at `install` (when the topology is first known) and indexed without
//! synchronization afterward. `install`/`flow_init`/`schedule`/`select` is a
//! documented call order (spec §4.2), not something the type system
//! enforces, so this follows the same discipline as
//! [`TaskLinks`](crate::task::TaskLinks): an `UnsafeCell` plus an explicit
//! contract rather than a runtime-checked lock.

use alloc::vec::Vec;
use core::cell::UnsafeCell;

/// A vector built exactly once (at `install`) and indexed read-only
/// thereafter.
pub struct Slots<T> {
    items: UnsafeCell<Vec<T>>,
}

// SAFETY: `init` is called exactly once, before any concurrent `get` per
// the module lifecycle contract; `get` only ever hands out shared
// references into a `Vec` that is never resized again afterward.
unsafe impl<T: Send> Send for Slots<T> {}
// SAFETY: same discipline as `Send` above.
unsafe impl<T: Send + Sync> Sync for Slots<T> {}

impl<T> Slots<T> {
    /// Creates an empty, uninitialized table.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: UnsafeCell::new(Vec::new()) }
    }

    /// Populates the table. Must be called exactly once, with no concurrent
    /// `get` calls in flight (i.e. during `install`).
    ///
    /// # Safety
    ///
    /// The caller must guarantee this runs-before (in the happens-before
    /// sense) every subsequent call to [`get`](Self::get).
    pub unsafe fn init(&self, items: Vec<T>) {
        // SAFETY: forwarded to caller.
        unsafe { *self.items.get() = items };
    }

    /// Borrows the slot at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or [`init`](Self::init) was never
    /// called.
    #[must_use]
    pub fn get(&self, index: usize) -> &T {
        // SAFETY: `init` happens-before any `get` per the type's contract;
        // after `init` the backing `Vec` is never mutated again, so handing
        // out a shared reference is sound even without a lock.
        let items = unsafe { &*self.items.get() };
        &items[index]
    }

    /// Number of slots, or 0 if uninitialized.
    #[must_use]
    pub fn len(&self) -> usize {
        // SAFETY: shared read of a `Vec` that, after `init`, never resizes.
        unsafe { &*self.items.get() }.len()
    }
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self::new()
    }
}
