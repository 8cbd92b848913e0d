//! Intrusive doubly-linked circular list, the ready-queue container from
//! spec §3: holds either task descriptors (flat-list schedulers) or heap
//! envelopes (heap-list schedulers), optionally kept sorted by a priority
//! key. All operations are O(1) except sorted insertion, which is O(k) in
//! the insertion depth.

use core::ptr::NonNull;

/// A type whose instances can be linked into a [`List`].
///
/// Unlike [`crate::task::Task`], whose link cell also has to represent heap
/// membership, list-only items (e.g. heap envelopes in the PBQ strategy)
/// need just a `prev`/`next` pair. Implementors are responsible for storing
/// that pair; `prev`/`next` are only meaningful while the node is linked.
///
/// # Safety
///
/// Implementations must give every live node its own, exclusively-owned
/// link storage, and `prev`/`next`/`set_prev`/`set_next` must agree with
/// each other (no aliasing between nodes).
pub unsafe trait Linked: Sized {
    /// Reads the node's current predecessor. Only valid while linked.
    unsafe fn prev(ptr: NonNull<Self>) -> NonNull<Self>;
    /// Reads the node's current successor. Only valid while linked.
    unsafe fn next(ptr: NonNull<Self>) -> NonNull<Self>;
    /// Overwrites the node's predecessor.
    unsafe fn set_prev(ptr: NonNull<Self>, prev: NonNull<Self>);
    /// Overwrites the node's successor.
    unsafe fn set_next(ptr: NonNull<Self>, next: NonNull<Self>);
    /// The key sorted insertion orders by, descending.
    fn sort_key(&self) -> i32;
}

/// A doubly-linked circular intrusive list.
pub struct List<T: Linked> {
    head: Option<NonNull<T>>,
    len: usize,
}

// SAFETY: `List` never grants access to its elements except through
// external synchronization the caller provides (a lock around the list
// head); it carries no aliasing beyond what `T: Send` already permits.
unsafe impl<T: Linked + Send> Send for List<T> {}

impl<T: Linked> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Linked> List<T> {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Number of elements currently linked.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the list holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The head element, without unlinking it.
    #[must_use]
    pub const fn peek_front(&self) -> Option<NonNull<T>> {
        self.head
    }

    /// Links a freestanding node as the new head.
    ///
    /// # Safety
    ///
    /// `node` must be live and not currently linked into any list.
    pub unsafe fn push_front(&mut self, node: NonNull<T>) {
        unsafe { self.splice_before(self.head, node) };
        self.head = Some(node);
    }

    /// Links a freestanding node as the new tail.
    ///
    /// # Safety
    ///
    /// `node` must be live and not currently linked into any list.
    pub unsafe fn push_back(&mut self, node: NonNull<T>) {
        unsafe { self.splice_before(self.head, node) };
        if self.head.is_none() {
            self.head = Some(node);
        }
    }

    /// Links a freestanding node so the list stays sorted by descending
    /// `sort_key` (spec §4.3 "insert each task into the shared list in
    /// priority-descending order").
    ///
    /// # Safety
    ///
    /// `node` must be live and not currently linked into any list.
    pub unsafe fn insert_sorted_desc(&mut self, node: NonNull<T>) {
        // SAFETY: `node` is live per caller contract.
        let key = unsafe { node.as_ref() }.sort_key();
        let mut cursor = self.head;
        let mut before = None;
        while let Some(candidate) = cursor {
            // SAFETY: every linked node is live.
            let candidate_key = unsafe { candidate.as_ref() }.sort_key();
            if candidate_key < key {
                before = Some(candidate);
                break;
            }
            // SAFETY: forwarded.
            let next = unsafe { T::next(candidate) };
            cursor = if Some(next) == self.head { None } else { Some(next) };
        }
        match before {
            Some(before) => {
                let is_new_head = self.head == Some(before);
                unsafe { self.splice_before(Some(before), node) };
                if is_new_head {
                    self.head = Some(node);
                }
            }
            None => unsafe { self.push_back(node) },
        }
    }

    /// Unlinks and returns the head element.
    ///
    /// The returned node's own link still reflects its old neighbors; for
    /// [`Task`](crate::task::Task) consumers the scheduler must reset it to
    /// `NotQueued` before handing the task back to the caller (spec §5).
    pub fn pop_front(&mut self) -> Option<NonNull<T>> {
        let head = self.head?;
        Some(unsafe { self.unlink(head) })
    }

    /// Unlinks and returns the tail element.
    pub fn pop_back(&mut self) -> Option<NonNull<T>> {
        let head = self.head?;
        // SAFETY: `head` is live; circular list guarantees `prev(head)` is
        // the tail.
        let tail = unsafe { T::prev(head) };
        Some(unsafe { self.unlink(tail) })
    }

    /// Splices `node` into the list immediately before `before` (or at the
    /// tail, if `before` is `None` and the list is non-empty; as the sole
    /// element if the list is empty). Does not update `self.head`.
    ///
    /// # Safety
    ///
    /// `node` must be live and unlinked; `before`, if present, must
    /// currently be linked in this list.
    unsafe fn splice_before(&mut self, before: Option<NonNull<T>>, node: NonNull<T>) {
        match (before, self.head) {
            (_, None) => {
                // SAFETY: `node` is a fresh, freestanding node.
                unsafe {
                    T::set_prev(node, node);
                    T::set_next(node, node);
                }
            }
            (Some(before), Some(_)) => {
                // SAFETY: `before` is live and linked.
                let prev = unsafe { T::prev(before) };
                unsafe {
                    T::set_next(prev, node);
                    T::set_prev(node, prev);
                    T::set_next(node, before);
                    T::set_prev(before, node);
                }
            }
            (None, Some(head)) => {
                // Insert at the tail.
                let tail = unsafe { T::prev(head) };
                unsafe {
                    T::set_next(tail, node);
                    T::set_prev(node, tail);
                    T::set_next(node, head);
                    T::set_prev(head, node);
                }
            }
        }
        self.len += 1;
    }

    /// Removes `node` (which must currently be linked in this list) and
    /// returns it, fixing up neighbors and `self.head`.
    ///
    /// # Safety
    ///
    /// `node` must be live and currently linked into this list.
    unsafe fn unlink(&mut self, node: NonNull<T>) -> NonNull<T> {
        // SAFETY: `node` is live and linked.
        let prev = unsafe { T::prev(node) };
        let next = unsafe { T::next(node) };
        if next == node {
            self.head = None;
        } else {
            unsafe {
                T::set_next(prev, next);
                T::set_prev(next, prev);
            }
            if self.head == Some(node) {
                self.head = Some(next);
            }
        }
        self.len -= 1;
        node
    }
}

/// Every [`Task`](crate::task::Task) can be linked into a [`List`] using its
/// existing link cell's [`InList`](crate::task::Link::InList) variant — no
/// separate storage needed, matching spec §3's "two sibling pointers...
/// usable by the scheduler for containment in exactly one structure at a
/// time".
unsafe impl<T: crate::task::Task> Linked for T {
    unsafe fn prev(ptr: NonNull<Self>) -> NonNull<Self> {
        match unsafe { crate::task::link_of(ptr) } {
            crate::task::Link::InList { prev, .. } => prev,
            other => panic!("list traversal found a node not linked as InList: {other:?}"),
        }
    }

    unsafe fn next(ptr: NonNull<Self>) -> NonNull<Self> {
        match unsafe { crate::task::link_of(ptr) } {
            crate::task::Link::InList { next, .. } => next,
            other => panic!("list traversal found a node not linked as InList: {other:?}"),
        }
    }

    unsafe fn set_prev(ptr: NonNull<Self>, prev: NonNull<Self>) {
        // The paired `set_next` call (always made immediately before or
        // after by `List`) overwrites this placeholder when transitioning
        // from `NotQueued`.
        let next = match unsafe { crate::task::link_of(ptr) } {
            crate::task::Link::InList { next, .. } => next,
            _ => ptr,
        };
        unsafe { crate::task::set_link(ptr, crate::task::Link::InList { prev, next }) };
    }

    unsafe fn set_next(ptr: NonNull<Self>, next: NonNull<Self>) {
        let prev = match unsafe { crate::task::link_of(ptr) } {
            crate::task::Link::InList { prev, .. } => prev,
            _ => ptr,
        };
        unsafe { crate::task::set_link(ptr, crate::task::Link::InList { prev, next }) };
    }

    fn sort_key(&self) -> i32 {
        self.priority()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use core::cell::Cell;

    struct Item {
        key: i32,
        prev: Cell<Option<NonNull<Item>>>,
        next: Cell<Option<NonNull<Item>>>,
    }

    unsafe impl Linked for Item {
        unsafe fn prev(ptr: NonNull<Self>) -> NonNull<Self> {
            unsafe { ptr.as_ref() }.prev.get().unwrap()
        }
        unsafe fn next(ptr: NonNull<Self>) -> NonNull<Self> {
            unsafe { ptr.as_ref() }.next.get().unwrap()
        }
        unsafe fn set_prev(ptr: NonNull<Self>, prev: NonNull<Self>) {
            unsafe { ptr.as_ref() }.prev.set(Some(prev));
        }
        unsafe fn set_next(ptr: NonNull<Self>, next: NonNull<Self>) {
            unsafe { ptr.as_ref() }.next.set(Some(next));
        }
        fn sort_key(&self) -> i32 {
            self.key
        }
    }

    fn leak(key: i32) -> NonNull<Item> {
        let item = Box::new(Item {
            key,
            prev: Cell::new(None),
            next: Cell::new(None),
        });
        NonNull::from(Box::leak(item))
    }

    unsafe fn free(ptr: NonNull<Item>) {
        unsafe { drop(Box::from_raw(ptr.as_ptr())) };
    }

    #[test]
    fn push_back_pop_front_is_fifo() {
        let mut list = List::new();
        let items: alloc::vec::Vec<_> = [1, 2, 3].into_iter().map(leak).collect();
        for &i in &items {
            unsafe { list.push_back(i) };
        }
        assert_eq!(list.len(), 3);
        for &expected in &items {
            let got = list.pop_front().unwrap();
            assert_eq!(got, expected);
        }
        assert!(list.is_empty());
        for i in items {
            unsafe { free(i) };
        }
    }

    #[test]
    fn push_front_pop_front_is_lifo() {
        let mut list = List::new();
        let items: alloc::vec::Vec<_> = [1, 2, 3].into_iter().map(leak).collect();
        for &i in &items {
            unsafe { list.push_front(i) };
        }
        for &expected in items.iter().rev() {
            assert_eq!(list.pop_front().unwrap(), expected);
        }
        for i in items {
            unsafe { free(i) };
        }
    }

    #[test]
    fn insert_sorted_desc_maintains_order() {
        let mut list = List::new();
        for key in [5, 3, 8, 1, 9, 2, 7] {
            let n = leak(key);
            unsafe { list.insert_sorted_desc(n) };
        }
        let mut out = alloc::vec::Vec::new();
        while let Some(n) = list.pop_front() {
            out.push(unsafe { n.as_ref() }.key);
            unsafe { free(n) };
        }
        assert_eq!(out, alloc::vec![9, 8, 7, 5, 3, 2, 1]);
    }

    #[test]
    fn pop_back_returns_tail() {
        let mut list = List::new();
        let items: alloc::vec::Vec<_> = [1, 2, 3].into_iter().map(leak).collect();
        for &i in &items {
            unsafe { list.push_back(i) };
        }
        assert_eq!(list.pop_back().unwrap(), items[2]);
        assert_eq!(list.pop_back().unwrap(), items[1]);
        assert_eq!(list.pop_back().unwrap(), items[0]);
        for i in items {
            unsafe { free(i) };
        }
    }
}
