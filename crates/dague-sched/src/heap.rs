//! Array-free, pointer-linked binary max-heap keyed on task priority.
//!
//! Not thread-safe (spec §4.1); callers serialize. The heap reuses each
//! task's link cell as the heap's left/right child pointers via
//! [`Link::InHeap`](crate::task::Link::InHeap) rather than storing shape
//! metadata out of line — insertion and removal slots are derived purely
//! from `size` by the canonical bit-walk described below.

use core::ptr::NonNull;

use crate::task::{link_of, priority_of, set_link, Link, Task};

/// An envelope holding a max-heap of tasks.
///
/// `size == 0` implies `top == None`; `size == 1` implies the sole task has
/// no heap children (spec §3 heap-node invariants).
pub struct Heap<T> {
    size: u32,
    priority: i32,
    top: Option<NonNull<T>>,
}

// SAFETY: a `Heap` never grants access to its elements except through
// whatever external synchronization the caller provides around the heap
// itself; it carries no aliasing beyond what `T: Send` already permits.
unsafe impl<T: Send> Send for Heap<T> {}

impl<T> Default for Heap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Heap<T> {
    /// Creates an empty heap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            size: 0,
            priority: i32::MIN,
            top: None,
        }
    }

    /// Number of tasks currently held.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.size
    }

    /// Whether the heap holds no tasks.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The cached root priority. Invariant: equals `top`'s priority whenever
    /// `top` is `Some` (spec §8 invariant 5).
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// The root task, without removing it.
    #[must_use]
    pub const fn peek(&self) -> Option<NonNull<T>> {
        self.top
    }
}

impl<T: Task> Heap<T> {
    /// Builds a singleton heap directly from an already-unqueued task.
    ///
    /// # Safety
    ///
    /// `task` must be live and currently [`Link::NotQueued`].
    pub unsafe fn singleton(task: NonNull<T>) -> Self {
        // SAFETY: caller guarantees `task` is live and unqueued.
        unsafe { set_link(task, Link::InHeap { left: None, right: None }) };
        Self {
            size: 1,
            priority: unsafe { priority_of(task) },
            top: Some(task),
        }
    }

    /// Inserts `task`, which must not currently belong to any structure.
    ///
    /// # Safety
    ///
    /// `task` must be live and currently [`Link::NotQueued`]; it must not
    /// already be reachable from this heap or any other structure.
    pub unsafe fn insert(&mut self, task: NonNull<T>) {
        // SAFETY: caller guarantees `task` is live and unqueued.
        unsafe { set_link(task, Link::InHeap { left: None, right: None }) };
        self.size += 1;
        let n = self.size;

        if n == 1 {
            self.top = Some(task);
            self.priority = unsafe { priority_of(task) };
            return;
        }

        let root = self
            .top
            .expect("heap with size > 1 must already have a root");
        let (steps, count) = bit_walk_steps(n);
        // SAFETY: the heap's shape invariant guarantees this path exists.
        let ancestors = unsafe { locate_ancestors(root, &steps, count) };
        let parent = ancestors[count - 1].expect("bit-walk parent slot must exist");
        let go_right = steps[count - 1];

        // SAFETY: `parent` is live (reached via the shape invariant).
        unsafe {
            let (left, right) = children(parent);
            if go_right {
                debug_assert!(right.is_none(), "bit-walk insertion slot already occupied");
                set_children(parent, left, Some(task));
            } else {
                debug_assert!(left.is_none(), "bit-walk insertion slot already occupied");
                set_children(parent, Some(task), right);
            }
        }

        // SAFETY: `ancestors`/`steps` describe a path of live nodes.
        unsafe { self.bubble_up(task, &ancestors, &steps, count) };
    }

    /// Removes and returns the root task, rebalancing the remainder.
    ///
    /// # Safety
    ///
    /// All nodes reachable through the heap must be live.
    pub unsafe fn remove(&mut self) -> Option<NonNull<T>> {
        let root = self.top?;

        match self.size {
            0 => None,
            1 => {
                self.top = None;
                self.size = 0;
                self.priority = i32::MIN;
                // SAFETY: `root` is live; it is being removed from the heap.
                unsafe { set_link(root, Link::NotQueued) };
                Some(root)
            }
            2 => {
                // SAFETY: a size-2 heap's root has exactly a left child.
                let (left, _right) = unsafe { children(root) };
                let new_root = left.expect("size-2 heap must have a left child");
                unsafe {
                    set_children(new_root, None, None);
                    set_link(root, Link::NotQueued);
                }
                self.top = Some(new_root);
                self.size = 1;
                self.priority = unsafe { priority_of(new_root) };
                Some(root)
            }
            size => {
                let (steps, count) = bit_walk_steps(size);
                // SAFETY: shape invariant guarantees the path exists.
                let ancestors = unsafe { locate_ancestors(root, &steps, count) };
                let parent = ancestors[count - 1].expect("bit-walk parent slot must exist");
                let last_is_right = steps[count - 1];

                // SAFETY: `parent` is live; the last slot exists by the
                // shape invariant for the current `size`.
                let last = unsafe {
                    let (left, right) = children(parent);
                    if last_is_right { right } else { left }
                }
                .expect("bit-walk last-node slot must exist");

                // SAFETY: detaching `last` from its current parent.
                unsafe {
                    let (left, right) = children(parent);
                    if last_is_right {
                        set_children(parent, left, None);
                    } else {
                        set_children(parent, None, right);
                    }
                }

                // SAFETY: `root` is still live; reading its remaining
                // children (already excludes `last` if `parent == root`).
                let (root_left, root_right) = unsafe { children(root) };
                unsafe {
                    set_children(last, root_left, root_right);
                    set_link(root, Link::NotQueued);
                }

                self.top = Some(last);
                self.size -= 1;
                // SAFETY: `last` now occupies the root slot with a live subtree.
                unsafe { self.bubble_down(last) };
                self.priority =
                    unsafe { priority_of(self.top.expect("heap must retain a root")) };
                Some(root)
            }
        }
    }

    /// O(1) theft: hands the entire root to the caller and splits the
    /// remaining two subtrees into "kept" (stays in `self`) and "new" (a
    /// freshly-built heap the caller takes ownership of).
    ///
    /// Does not restore a global invariant over the combined tree because
    /// none is needed: the root was already the maximum, and each resulting
    /// subtree is a valid max-heap because it was a subtree of one (spec
    /// §4.1).
    ///
    /// # Safety
    ///
    /// All nodes reachable through the heap must be live.
    pub unsafe fn split_and_steal(&mut self) -> (Option<NonNull<T>>, Option<Heap<T>>) {
        match self.size {
            0 => (None, None),
            1 => {
                let root = self.top.take().expect("size-1 heap must have a root");
                self.size = 0;
                self.priority = i32::MIN;
                // SAFETY: `root` is live; removed from the heap.
                unsafe { set_link(root, Link::NotQueued) };
                (Some(root), None)
            }
            2 => {
                let root = self.top.expect("size-2 heap must have a root");
                // SAFETY: a size-2 heap's root has exactly a left child.
                let (left, _right) = unsafe { children(root) };
                let new_root = left.expect("size-2 heap must have a left child");
                unsafe {
                    set_children(new_root, None, None);
                    set_link(root, Link::NotQueued);
                }
                self.top = Some(new_root);
                self.size = 1;
                self.priority = unsafe { priority_of(new_root) };
                (Some(root), None)
            }
            size => {
                let root = self.top.expect("size>=3 heap must have a root");
                // SAFETY: a size>=3 heap's root has both children present.
                let (left, right) = unsafe { children(root) };
                let left = left.expect("size>=3 heap root must have a left subtree");
                let right = right.expect("size>=3 heap root must have a right subtree");

                let highest_pos = 31 - size.leading_zeros();
                let h = 1u32 << highest_pos;
                let t = h >> 1;
                let (new_size, kept_size) = if (t & size) != 0 {
                    let kept = size & !h;
                    let new = size - kept - 1;
                    (new, kept)
                } else {
                    let new = (size & !h) + t;
                    let kept = size - new - 1;
                    (new, kept)
                };

                // SAFETY: `root` is detached; its subtrees become the two
                // resulting heaps below.
                unsafe { set_link(root, Link::NotQueued) };

                self.top = Some(right);
                self.size = kept_size;
                self.priority = unsafe { priority_of(right) };

                let new_heap = Heap {
                    size: new_size,
                    priority: unsafe { priority_of(left) },
                    top: Some(left),
                };

                (Some(root), Some(new_heap))
            }
        }
    }

    /// Moves `task` (freshly placed at a leaf) up while it outranks its
    /// parent, preserving every ancestor's other child and grandparent link.
    ///
    /// # Safety
    ///
    /// `ancestors[..count]` must be the live root-to-parent chain for
    /// `task`'s current slot, with `steps[..count]` the matching left/right
    /// selectors (`steps[k]` describes the step from `ancestors[k]`).
    unsafe fn bubble_up(
        &mut self,
        task: NonNull<T>,
        ancestors: &[Option<NonNull<T>>; 32],
        steps: &[bool; 32],
        count: usize,
    ) {
        let priority = unsafe { priority_of(task) };
        let mut i = count;
        while i > 0 {
            let parent = ancestors[i - 1].expect("ancestor must exist");
            if unsafe { priority_of(parent) } >= priority {
                break;
            }
            let child_is_right = steps[i - 1];
            let grandparent = if i >= 2 { ancestors[i - 2] } else { None };
            let grandparent_side_is_right = if i >= 2 { steps[i - 2] } else { false };
            unsafe {
                swap_with_parent(
                    grandparent,
                    grandparent_side_is_right,
                    parent,
                    task,
                    child_is_right,
                );
            }
            i -= 1;
        }
        if i == 0 {
            self.top = Some(task);
        }
        self.priority = unsafe { priority_of(self.top.expect("heap must retain a root")) };
    }

    /// Moves `node` (freshly placed at the root) down while a child outranks
    /// it, swapping with the higher-priority child at each step. Ties break
    /// toward the right (`next`) side, matching the source's apparent
    /// preference (spec §9 Open Questions; decision recorded in `DESIGN.md`).
    ///
    /// # Safety
    ///
    /// `node` and everything reachable below it must be live.
    unsafe fn bubble_down(&mut self, node: NonNull<T>) {
        let mut prev_occupant: Option<NonNull<T>> = None;
        let mut prev_side_is_right = false;
        let mut new_root: Option<NonNull<T>> = None;
        let node_cursor = node;

        loop {
            // SAFETY: `node_cursor` is live.
            let (left, right) = unsafe { children(node_cursor) };
            let node_priority = unsafe { priority_of(node_cursor) };
            let lp = left.map(|l| unsafe { priority_of(l) });
            let rp = right.map(|r| unsafe { priority_of(r) });

            let go_right = match (lp, rp) {
                (None, None) => break,
                (Some(_), None) => false,
                (None, Some(_)) => true,
                (Some(l), Some(r)) => r >= l,
            };
            let (child, child_priority) = if go_right {
                (right.expect("right child must exist"), rp.expect("right priority must exist"))
            } else {
                (left.expect("left child must exist"), lp.expect("left priority must exist"))
            };
            if child_priority <= node_priority {
                break;
            }

            unsafe {
                swap_with_parent(
                    prev_occupant,
                    prev_side_is_right,
                    node_cursor,
                    child,
                    go_right,
                );
            }
            if new_root.is_none() {
                new_root = Some(child);
            }
            prev_occupant = Some(child);
            prev_side_is_right = go_right;
        }

        if let Some(root) = new_root {
            self.top = Some(root);
        }
    }
}

/// Returns the left/right child pointers of `node` as stored in its
/// [`Link::InHeap`] state.
///
/// # Safety
///
/// `node` must be live and currently linked as a heap node.
#[inline]
unsafe fn children<T: Task>(node: NonNull<T>) -> (Option<NonNull<T>>, Option<NonNull<T>>) {
    match unsafe { link_of(node) } {
        Link::InHeap { left, right } => (left, right),
        other => panic!("heap traversal found a node not linked as InHeap: {other:?}"),
    }
}

/// Overwrites the left/right child pointers of `node`.
///
/// # Safety
///
/// `node` must be live.
#[inline]
unsafe fn set_children<T: Task>(
    node: NonNull<T>,
    left: Option<NonNull<T>>,
    right: Option<NonNull<T>>,
) {
    unsafe { set_link(node, Link::InHeap { left, right }) };
}

/// Swaps tree position between `parent` and one of its children, preserving
/// the parent's other child and the grandparent→parent link (spec §4.1
/// insert: "swap must preserve both the parent↔grandparent link and both
/// children of the old parent"). After the call, `child` occupies `parent`'s
/// old slot and `parent` occupies `child`'s old slot.
///
/// # Safety
///
/// `parent`, `child`, and `grandparent` (if present) must be live, and
/// `child` must currently be the `child_is_right` side of `parent`.
unsafe fn swap_with_parent<T: Task>(
    grandparent: Option<NonNull<T>>,
    grandparent_side_is_right: bool,
    parent: NonNull<T>,
    child: NonNull<T>,
    child_is_right: bool,
) {
    // SAFETY: forwarded from caller.
    let (p_left, p_right) = unsafe { children(parent) };
    let sibling = if child_is_right { p_left } else { p_right };
    let (c_left, c_right) = unsafe { children(child) };

    unsafe {
        if child_is_right {
            set_children(child, sibling, Some(parent));
        } else {
            set_children(child, Some(parent), sibling);
        }
        set_children(parent, c_left, c_right);

        if let Some(g) = grandparent {
            let (g_left, g_right) = children(g);
            if grandparent_side_is_right {
                set_children(g, g_left, Some(child));
            } else {
                set_children(g, Some(child), g_right);
            }
        }
    }
}

/// Decomposes `n`'s bit pattern below its highest set bit into a sequence of
/// left(`false`)/right(`true`) steps, per spec §4.1's bit-walk rule. Returns
/// the steps (root-to-slot order) and how many are valid.
fn bit_walk_steps(n: u32) -> ([bool; 32], usize) {
    debug_assert!(n >= 1, "bit-walk is undefined for n == 0");
    let highest = 31 - n.leading_zeros();
    let mut steps = [false; 32];
    let mut count = 0usize;
    let mut bit = highest;
    while bit > 0 {
        bit -= 1;
        steps[count] = (n >> bit) & 1 != 0;
        count += 1;
    }
    (steps, count)
}

/// Walks `count` steps from `root`, recording every node visited
/// (`ancestors[0] == root`, `ancestors[count - 1]` is the parent of the
/// slot `steps` ultimately selects).
///
/// # Safety
///
/// Every node along the path described by `steps[..count - 1]` must be
/// live and already linked as a heap node.
unsafe fn locate_ancestors<T: Task>(
    root: NonNull<T>,
    steps: &[bool; 32],
    count: usize,
) -> [Option<NonNull<T>>; 32] {
    let mut ancestors = [None; 32];
    let mut node = root;
    for i in 0..count {
        ancestors[i] = Some(node);
        if i + 1 < count {
            // SAFETY: forwarded from caller.
            let (left, right) = unsafe { children(node) };
            node = if steps[i] { right } else { left }
                .expect("heap shape invariant violated during descent");
        }
    }
    ancestors
}
