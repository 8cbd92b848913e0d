//! AP: each EU owns a private priority-sorted list; no cross-EU visibility
//! and therefore no stealing (spec §4.4 Non-goals).

use core::ptr::NonNull;

use dague_core::error::Result;
use dague_core::sync::{Barrier, SpinLock};

use crate::context::{Context, ExecutionUnit};
use crate::list::List;
use crate::module::Schedule;
use crate::slots::Slots;
use crate::task::{set_link, Chain, Link, Task};

/// Private-priority-list strategy.
pub struct Ap<T: Task> {
    per_eu: Slots<SpinLock<List<T>>>,
}

impl<T: Task> Ap<T> {
    /// Creates an uninitialized strategy; call [`install`](Schedule::install)
    /// before use.
    #[must_use]
    pub const fn new() -> Self {
        Self { per_eu: Slots::new() }
    }
}

impl<T: Task> Default for Ap<T> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: all shared mutable state lives behind `Slots`/`SpinLock`.
unsafe impl<T: Task> Send for Ap<T> {}
// SAFETY: same discipline as `Send` above.
unsafe impl<T: Task> Sync for Ap<T> {}

impl<T: Task> Schedule<T> for Ap<T> {
    fn install(&self, ctx: &Context) -> Result<()> {
        let mut lists = alloc::vec::Vec::with_capacity(ctx.eu_count());
        for _ in 0..ctx.eu_count() {
            lists.push(SpinLock::new(List::new()));
        }
        // SAFETY: `install` runs once, before any EU calls `flow_init`.
        unsafe { self.per_eu.init(lists) };
        Ok(())
    }

    fn flow_init(&self, _eu: &ExecutionUnit, barrier: &Barrier) {
        barrier.arrive_and_wait();
    }

    unsafe fn schedule(&self, eu: &ExecutionUnit, chain: Chain<T>, _distance: u32) -> Result<()> {
        let list_lock = self.per_eu.get(eu.global_index());
        let mut list = list_lock.lock();
        // SAFETY: every task reachable from `chain` is live per caller
        // contract.
        for task in unsafe { chain.iter() } {
            // SAFETY: resets chain membership before re-linking into `list`.
            unsafe { set_link(task, Link::NotQueued) };
            // SAFETY: `task` was just reset to `NotQueued` above.
            unsafe { list.insert_sorted_desc(task) };
        }
        Ok(())
    }

    fn select(&self, eu: &ExecutionUnit) -> (Option<NonNull<T>>, u32) {
        let list_lock = self.per_eu.get(eu.global_index());
        let mut list = list_lock.lock();
        let popped = list.pop_front();
        if let Some(task) = popped {
            // SAFETY: `task` was just unlinked from `list`.
            unsafe { set_link(task, Link::NotQueued) };
        }
        (popped, 0)
    }

    fn remove(&self, _ctx: &Context) {}
}
