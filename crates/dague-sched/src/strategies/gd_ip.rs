//! GD/IP: a single priority-sorted list shared by every EU of a VP.
//!
//! `schedule` with `distance == 0` inserts in priority order; any other
//! distance is appended unsorted to the tail, favoring submission order for
//! tasks the source treats as "less local" (spec §4.3). GD and IP differ
//! only in which end `select` drains — an Open Question spec.md leaves
//! unresolved; see `DESIGN.md` for the decision this crate makes.

use core::ptr::NonNull;

use dague_core::error::Result;
use dague_core::sync::{Barrier, SpinLock};

use crate::context::{Context, ExecutionUnit};
use crate::list::List;
use crate::module::Schedule;
use crate::slots::Slots;
use crate::task::{set_link, Chain, Link, Task};

/// The shared-list strategy. `pop_front` distinguishes GD from IP.
pub struct GdIp<T: Task> {
    per_vp: Slots<SpinLock<List<T>>>,
    pop_front: bool,
}

impl<T: Task> GdIp<T> {
    /// GD: drains the sorted end first, so a VP always runs its
    /// highest-priority ready task next regardless of submission distance.
    #[must_use]
    pub const fn gd() -> Self {
        Self { per_vp: Slots::new(), pop_front: true }
    }

    /// IP: drains the tail, so distance-0 low-priority tasks and any
    /// unsorted distance>0 arrivals are consumed before older sorted work.
    #[must_use]
    pub const fn ip() -> Self {
        Self { per_vp: Slots::new(), pop_front: false }
    }
}

// SAFETY: all shared mutable state lives behind `Slots`/`SpinLock`, which
// provide their own synchronization; `T: Task`'s raw pointers are only ever
// dereferenced under the relevant lock.
unsafe impl<T: Task> Send for GdIp<T> {}
// SAFETY: same discipline as `Send` above.
unsafe impl<T: Task> Sync for GdIp<T> {}

impl<T: Task> Schedule<T> for GdIp<T> {
    fn install(&self, ctx: &Context) -> Result<()> {
        let mut lists = alloc::vec::Vec::with_capacity(ctx.vp_count());
        for _ in 0..ctx.vp_count() {
            lists.push(SpinLock::new(List::new()));
        }
        // SAFETY: `install` runs once, before any EU calls `flow_init`.
        unsafe { self.per_vp.init(lists) };
        Ok(())
    }

    fn flow_init(&self, _eu: &ExecutionUnit, barrier: &Barrier) {
        barrier.arrive_and_wait();
    }

    unsafe fn schedule(&self, eu: &ExecutionUnit, chain: Chain<T>, distance: u32) -> Result<()> {
        let list_lock = self.per_vp.get(eu.vp_index());
        let mut list = list_lock.lock();
        // SAFETY: every task reachable from `chain` is live per caller
        // contract; the chain is consumed here so no task is visited twice.
        for task in unsafe { chain.iter() } {
            // SAFETY: `set_link` resets the chain membership before this
            // task is handed to a different structure.
            unsafe { set_link(task, Link::NotQueued) };
            if distance == 0 {
                // SAFETY: `task` was just reset to `NotQueued` above.
                unsafe { list.insert_sorted_desc(task) };
            } else {
                // SAFETY: same as above.
                unsafe { list.push_back(task) };
            }
        }
        Ok(())
    }

    fn select(&self, eu: &ExecutionUnit) -> (Option<NonNull<T>>, u32) {
        let list_lock = self.per_vp.get(eu.vp_index());
        let mut list = list_lock.lock();
        let popped = if self.pop_front { list.pop_front() } else { list.pop_back() };
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

    #[test]
    fn gd_pops_highest_priority_first() {
        let ctx = Context::new(&[1]);
        let strategy: GdIp<T> = GdIp::gd();
        strategy.install(&ctx).unwrap();
        let barrier = Barrier::new(1);
        strategy.flow_init(ctx.eu(0), &barrier);

        for p in [2, 5, 1] {
            let n = T::leak(p);
            let chain = unsafe { Chain::singleton(n) };
            unsafe { strategy.schedule(ctx.eu(0), chain, 0) }.unwrap();
        }
        let mut out = alloc::vec::Vec::new();
        while let (Some(n), _) = strategy.select(ctx.eu(0)) {
            out.push(unsafe { n.as_ref() }.priority());
            unsafe { drop(alloc::boxed::Box::from_raw(n.as_ptr())) };
        }
        assert_eq!(out, alloc::vec![5, 2, 1]);
    }
}
