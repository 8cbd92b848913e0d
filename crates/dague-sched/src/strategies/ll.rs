//! LL/LFQ: each EU owns a private LIFO stack; the fallback strategy the
//! registry selects when an unrecognized module name is requested (spec
//! §7, UNKNOWN_MODULE).

use core::ptr::NonNull;

use dague_core::error::Result;
use dague_core::sync::{Barrier, SpinLock};

use crate::context::{Context, ExecutionUnit};
use crate::list::List;
use crate::module::Schedule;
use crate::slots::Slots;
use crate::task::{set_link, Chain, Link, Task};

/// Private-LIFO-stack strategy.
pub struct Ll<T: Task> {
    per_eu: Slots<SpinLock<List<T>>>,
}

impl<T: Task> Ll<T> {
    /// Creates an uninitialized strategy; call [`install`](Schedule::install)
    /// before use.
    #[must_use]
    pub const fn new() -> Self {
        Self { per_eu: Slots::new() }
    }
}

impl<T: Task> Default for Ll<T> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: all shared mutable state lives behind `Slots`/`SpinLock`.
unsafe impl<T: Task> Send for Ll<T> {}
// SAFETY: same discipline as `Send` above.
unsafe impl<T: Task> Sync for Ll<T> {}

impl<T: Task> Schedule<T> for Ll<T> {
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
            unsafe { list.push_front(task) };
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskIdentity;
    use core::sync::atomic::{AtomicI32, Ordering};

    struct T {
        priority: AtomicI32,
        links: crate::task::TaskLinks<T>,
    }

    impl T {
        fn leak(priority: i32) -> NonNull<T> {
            let boxed = alloc::boxed::Box::new(T {
                priority: AtomicI32::new(priority),
                links: crate::task::TaskLinks::new(),
            });
            NonNull::from(alloc::boxed::Box::leak(boxed))
        }
    }

    unsafe impl Task for T {
        fn priority(&self) -> i32 {
            self.priority.load(Ordering::Relaxed)
        }
        fn identity(&self) -> TaskIdentity<'_> {
            TaskIdentity { function_id: 0, handle_id: 0, locals: &[] }
        }
        unsafe fn links(ptr: NonNull<Self>) -> NonNull<crate::task::TaskLinks<Self>> {
            unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr.as_ptr()).links)) }
        }
    }

    /// Scenario D (spec §8): submitting `t1, t2, t3` (priorities `2, 5, 1`)
    /// one at a time, then draining, yields `t3, t2, t1` i.e. `1, 5, 2`.
    #[test]
    fn scenario_d_lifo_order() {
        let ctx = Context::new(&[1]);
        let strategy: Ll<T> = Ll::new();
        strategy.install(&ctx).unwrap();
        let barrier = Barrier::new(1);
        strategy.flow_init(ctx.eu(0), &barrier);

        for p in [2, 5, 1] {
            let chain = unsafe { Chain::singleton(T::leak(p)) };
            unsafe { strategy.schedule(ctx.eu(0), chain, 0) }.unwrap();
        }
        let mut out = alloc::vec::Vec::new();
        while let (Some(n), _) = strategy.select(ctx.eu(0)) {
            out.push(unsafe { n.as_ref() }.priority());
            unsafe { drop(alloc::boxed::Box::from_raw(n.as_ptr())) };
        }
        assert_eq!(out, alloc::vec![1, 5, 2]);
    }
}
