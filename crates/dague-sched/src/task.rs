//! The task descriptor contract: the only fields the scheduler may touch.
//!
//! A task is opaque to the scheduler except for its priority and its two
//! sibling pointers. Those pointers are reused for both list membership and
//! heap-child linkage (spec "Design Notes": a systems-language rewrite keeps
//! the structural idea — O(1) membership changes, no per-insert allocation —
//! but replaces the source's self-cyclic raw pointers with a tagged enum).

use core::ptr::NonNull;

/// The current linkage state of a task, tagged so "not in any structure" is
/// representable without a self-cycle.
///
/// Replaces the source's `prev = next = self` convention (see `DESIGN.md`
/// Open Questions / Design Notes): `NotQueued` is an explicit state rather
/// than a self-referential sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link<T: ?Sized> {
    /// Not contained in any list or heap.
    NotQueued,
    /// Linked into a doubly-linked intrusive list.
    InList {
        /// Previous sibling in the list.
        prev: NonNull<T>,
        /// Next sibling in the list.
        next: NonNull<T>,
    },
    /// Linked into a binary heap as an internal or leaf node.
    InHeap {
        /// Left child, if present.
        left: Option<NonNull<T>>,
        /// Right child, if present.
        right: Option<NonNull<T>>,
    },
}

impl<T: ?Sized> Link<T> {
    /// Returns `true` unless the task is entirely unlinked.
    #[must_use]
    pub const fn is_queued(&self) -> bool {
        !matches!(self, Link::NotQueued)
    }
}

/// The cell a [`Task`] implementation stores its current [`Link`] in.
///
/// A thin `Send`/`Sync`-opting `UnsafeCell` wrapper, in the same spirit as
/// `hadron-core`'s `RacyCell`: the scheduler is the sole synchronizer of
/// task linkage (spec §5, "resource sharing: `task.prev/next` pointers are
/// the scheduler's exclusive property while the task is enqueued"), so the
/// compiler cannot prove exclusivity on its own.
#[repr(transparent)]
pub struct TaskLinks<T: ?Sized>(core::cell::UnsafeCell<Link<T>>);

// SAFETY: callers (scheduler strategies) serialize all access to a task's
// links per spec §5 — a task is owned by exactly one scheduler structure
// (and therefore one EU, or a locked list head) at a time.
unsafe impl<T: ?Sized> Send for TaskLinks<T> {}
// SAFETY: same discipline as `Send` above; the scheduler, not the type
// system, enforces exclusive access to a given task's links.
unsafe impl<T: ?Sized> Sync for TaskLinks<T> {}

impl<T: Sized> TaskLinks<T> {
    /// Creates a fresh, unqueued link cell.
    #[must_use]
    pub const fn new() -> Self {
        Self(core::cell::UnsafeCell::new(Link::NotQueued))
    }
}

impl<T: Sized> Default for TaskLinks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> TaskLinks<T> {
    /// Reads the current link state.
    ///
    /// # Safety
    ///
    /// The caller must hold whatever external lock (or single-EU ownership)
    /// governs this task's current structure.
    #[inline]
    pub unsafe fn get(&self) -> Link<T> {
        // SAFETY: forwarded to caller.
        unsafe { *self.0.get() }
    }

    /// Overwrites the current link state.
    ///
    /// # Safety
    ///
    /// Same requirement as [`get`](Self::get).
    #[inline]
    pub unsafe fn set(&self, link: Link<T>) {
        // SAFETY: forwarded to caller.
        unsafe { *self.0.get() = link };
    }
}

/// Tracing-only task identity. Never consulted by scheduling decisions.
#[derive(Debug, Clone, Copy)]
pub struct TaskIdentity<'a> {
    /// Identifies the generated task function (opaque to the scheduler).
    pub function_id: u32,
    /// Identifies the owning DAG submission (`Handle`).
    pub handle_id: u32,
    /// Small locals vector used only for diagnostics.
    pub locals: &'a [u64],
}

/// The scheduler's view of a task descriptor.
///
/// # Safety
///
/// `links` must return a pointer derived from `ptr` that is valid for as
/// long as the task is reachable through a scheduler structure, and must
/// consistently identify the same [`TaskLinks`] cell for a given task.
pub unsafe trait Task {
    /// Scheduling priority; larger is more urgent.
    fn priority(&self) -> i32;

    /// Tracing-only identity, never used for scheduling decisions.
    fn identity(&self) -> TaskIdentity<'_>;

    /// Returns a pointer to this task's link cell.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live, properly aligned `Self`.
    unsafe fn links(ptr: NonNull<Self>) -> NonNull<TaskLinks<Self>>;
}

/// Reads a task's current link state through its raw pointer.
///
/// # Safety
///
/// Same requirements as [`TaskLinks::get`]; `ptr` must be live.
#[inline]
pub unsafe fn link_of<T: Task>(ptr: NonNull<T>) -> Link<T> {
    // SAFETY: forwarded to caller.
    unsafe { T::links(ptr).as_ref().get() }
}

/// Overwrites a task's link state through its raw pointer.
///
/// # Safety
///
/// Same requirements as [`TaskLinks::set`]; `ptr` must be live.
#[inline]
pub unsafe fn set_link<T: Task>(ptr: NonNull<T>, link: Link<T>) {
    // SAFETY: forwarded to caller.
    unsafe { T::links(ptr).as_ref().set(link) };
}

/// Reads a task's priority through its raw pointer.
///
/// # Safety
///
/// `ptr` must be live and properly aligned.
#[inline]
pub unsafe fn priority_of<T: Task>(ptr: NonNull<T>) -> i32 {
    // SAFETY: forwarded to caller.
    unsafe { ptr.as_ref() }.priority()
}

/// Orders two tasks by priority, descending. The one external contract
/// every sorted-insert path in every strategy shares (spec §6,
/// `task_priority_comparator`).
#[must_use]
pub fn cmp_priority<T: Task>(a: &T, b: &T) -> core::cmp::Ordering {
    b.priority().cmp(&a.priority())
}

/// A circular doubly-linked sequence of tasks passed as a single unit to
/// `schedule`. The ordering seen when iterating is not guaranteed sorted
/// (spec §4.2).
pub struct Chain<T> {
    head: NonNull<T>,
}

impl<T: Task> Chain<T> {
    /// Wraps a single task as a one-element chain (self-linked).
    ///
    /// # Safety
    ///
    /// `task` must be live and currently [`Link::NotQueued`].
    pub unsafe fn singleton(task: NonNull<T>) -> Self {
        // SAFETY: caller guarantees `task` is live and unqueued.
        unsafe { set_link(task, Link::InList { prev: task, next: task }) };
        Self { head: task }
    }

    /// The chain's head pointer.
    #[must_use]
    pub fn head(&self) -> NonNull<T> {
        self.head
    }

    /// Iterates every task in the chain exactly once, starting at the head.
    ///
    /// # Safety
    ///
    /// Every task reachable from `head` via `InList` links must be live.
    #[must_use]
    pub unsafe fn iter(&self) -> ChainIter<T> {
        ChainIter {
            start: self.head,
            next: Some(self.head),
        }
    }
}

/// Iterator over a [`Chain`]'s tasks, walking `next` links back to the head.
pub struct ChainIter<T> {
    start: NonNull<T>,
    next: Option<NonNull<T>>,
}

impl<T: Task> Iterator for ChainIter<T> {
    type Item = NonNull<T>;

    fn next(&mut self) -> Option<NonNull<T>> {
        let current = self.next?;
        // SAFETY: the chain's links are valid for the lifetime of iteration
        // per `Chain::iter`'s safety contract.
        let next = match unsafe { link_of(current) } {
            Link::InList { next, .. } => next,
            _ => {
                self.next = None;
                return Some(current);
            }
        };
        self.next = if next == self.start { None } else { Some(next) };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicI32, Ordering};

    struct TestTask {
        priority: AtomicI32,
        links: TaskLinks<TestTask>,
    }

    impl TestTask {
        fn new(priority: i32) -> Self {
            Self {
                priority: AtomicI32::new(priority),
                links: TaskLinks::new(),
            }
        }
    }

    unsafe impl Task for TestTask {
        fn priority(&self) -> i32 {
            self.priority.load(Ordering::Relaxed)
        }

        fn identity(&self) -> TaskIdentity<'_> {
            TaskIdentity {
                function_id: 0,
                handle_id: 0,
                locals: &[],
            }
        }

        unsafe fn links(ptr: NonNull<Self>) -> NonNull<TaskLinks<Self>> {
            // SAFETY: `links` is a field projection of a live `TestTask`.
            unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr.as_ptr()).links)) }
        }
    }

    #[test]
    fn fresh_link_is_not_queued() {
        let task = TestTask::new(1);
        assert!(!unsafe { task.links.get() }.is_queued());
    }

    #[test]
    fn cmp_priority_orders_descending() {
        let a = TestTask::new(5);
        let b = TestTask::new(9);
        assert_eq!(cmp_priority(&a, &b), core::cmp::Ordering::Greater);
        assert_eq!(cmp_priority(&b, &a), core::cmp::Ordering::Less);
    }

    #[test]
    fn singleton_chain_yields_one_task() {
        let task = Box::new(TestTask::new(4));
        let ptr = NonNull::from(Box::leak(task));
        let chain = unsafe { Chain::singleton(ptr) };
        let items: alloc::vec::Vec<_> = unsafe { chain.iter() }.collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], ptr);
        unsafe {
            drop(Box::from_raw(ptr.as_ptr()));
        }
    }
}
