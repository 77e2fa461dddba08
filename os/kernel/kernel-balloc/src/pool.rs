//! # Interval Node Pool
//!
//! The allocator cannot allocate its own bookkeeping: it runs before any heap
//! exists. Every interval it tracks lives in an [`IntervalNode`] taken from a
//! fixed array handed in at startup.
//!
//! A node is always linked into exactly one intrusive container:
//!
//! ```text
//!            acquire()                    erase + release()
//!  ┌─────────────┐ ───────► ┌──────────────────────┐ ───────► ┌─────────────┐
//!  │  free list  │          │ memory_map or        │          │  free list  │
//!  │ (singly     │          │ free_ranges (RBTree) │          │             │
//!  │  linked)    │          └──────────────────────┘          │             │
//!  └─────────────┘                                            └─────────────┘
//! ```
//!
//! Ownership is tracked by which link is in use, never by a flag. Both
//! `acquire` and `release` are O(1).

use crate::{BootAllocError, PhysicalRange};
use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use intrusive_collections::{
    KeyAdapter, RBTreeLink, SinglyLinkedList, SinglyLinkedListLink, UnsafeRef, intrusive_adapter,
};
use log::error;

/// Record of a single interval, linked into either the pool or one set.
pub struct IntervalNode {
    tree_link: RBTreeLink,
    free_link: SinglyLinkedListLink,
    begin: Cell<u64>,
    end: Cell<u64>,
}

intrusive_adapter!(pub(crate) TreeAdapter = UnsafeRef<IntervalNode>: IntervalNode { tree_link: RBTreeLink });
intrusive_adapter!(pub(crate) FreeAdapter = UnsafeRef<IntervalNode>: IntervalNode { free_link: SinglyLinkedListLink });

// Sets are ordered by the first address of each interval.
impl<'a> KeyAdapter<'a> for TreeAdapter {
    type Key = u64;

    fn get_key(&self, node: &'a IntervalNode) -> Self::Key {
        node.begin.get()
    }
}

impl IntervalNode {
    /// An unlinked node covering nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tree_link: RBTreeLink::new(),
            free_link: SinglyLinkedListLink::new(),
            begin: Cell::new(0),
            end: Cell::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub fn range(&self) -> PhysicalRange {
        PhysicalRange::new(self.begin.get(), self.end.get())
    }

    #[inline]
    pub(crate) fn begin(&self) -> u64 {
        self.begin.get()
    }

    #[inline]
    pub(crate) fn end(&self) -> u64 {
        self.end.get()
    }

    /// Move the start of the interval. Only valid while the new start keeps
    /// the node in order relative to its tree neighbours.
    #[inline]
    pub(crate) fn set_begin(&self, begin: u64) {
        self.begin.set(begin);
    }

    #[inline]
    pub(crate) fn set_end(&self, end: u64) {
        self.end.set(end);
    }

    #[inline]
    fn set(&self, range: PhysicalRange) {
        self.begin.set(range.begin);
        self.end.set(range.end);
    }
}

impl Default for IntervalNode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IntervalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntervalNode").field(&self.range()).finish()
    }
}

/// Statically sized backing store for a [`NodePool`].
///
/// `const`-constructible so it can live in `.bss`.
pub struct NodeStorage<const N: usize>([IntervalNode; N]);

impl<const N: usize> NodeStorage<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self([const { IntervalNode::new() }; N])
    }

    /// Number of nodes in this storage.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn nodes_mut(&mut self) -> &mut [IntervalNode] {
        &mut self.0
    }
}

impl<const N: usize> Default for NodeStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Free list over a borrowed slice of [`IntervalNode`]s.
pub struct NodePool<'a> {
    free: SinglyLinkedList<FreeAdapter>,
    available: usize,
    capacity: usize,
    _nodes: PhantomData<&'a [IntervalNode]>,
}

impl<'a> NodePool<'a> {
    /// Put every node of `nodes` on the free list.
    ///
    /// Nodes are reset first, so storage used by an earlier pool can be reused.
    pub fn new(nodes: &'a mut [IntervalNode]) -> Self {
        for node in nodes.iter_mut() {
            *node = IntervalNode::new();
        }

        let nodes: &'a [IntervalNode] = nodes;
        let mut free = SinglyLinkedList::new(FreeAdapter::new());
        for node in nodes {
            // SAFETY: the slice is borrowed for 'a, which outlives the pool and
            // every set the nodes are lent to, and is never moved meanwhile.
            free.push_front(unsafe { UnsafeRef::from_raw(core::ptr::from_ref(node)) });
        }

        Self {
            free,
            available: nodes.len(),
            capacity: nodes.len(),
            _nodes: PhantomData,
        }
    }

    /// Total number of nodes managed by this pool.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of nodes currently on the free list.
    #[inline]
    #[must_use]
    pub const fn available(&self) -> usize {
        self.available
    }

    /// Take a node off the free list and give it the interval `range`.
    pub(crate) fn acquire(
        &mut self,
        range: PhysicalRange,
    ) -> Result<UnsafeRef<IntervalNode>, BootAllocError> {
        let Some(node) = self.free.pop_front() else {
            return Err(self.exhausted());
        };
        self.available -= 1;
        node.set(range);
        Ok(node)
    }

    /// Return a node to the free list.
    ///
    /// The node must already be unlinked from its set.
    pub(crate) fn release(&mut self, node: UnsafeRef<IntervalNode>) {
        self.free.push_front(node);
        self.available += 1;
    }

    /// The error for an empty free list, logged where it is raised.
    pub(crate) fn exhausted(&self) -> BootAllocError {
        error!(
            "Out of interval nodes: all {} nodes are in use",
            self.capacity
        );
        BootAllocError::PoolExhausted {
            capacity: self.capacity,
        }
    }
}

impl Drop for NodePool<'_> {
    fn drop(&mut self) {
        // Leave the links as they are; `NodePool::new` resets them on reuse.
        self.free.fast_clear();
    }
}

impl fmt::Debug for NodePool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodePool")
            .field("available", &self.available)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pool_is_full() {
        let mut storage = NodeStorage::<4>::new();
        let pool = NodePool::new(storage.nodes_mut());
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn acquire_until_exhausted() {
        let mut storage = NodeStorage::<2>::new();
        let mut pool = NodePool::new(storage.nodes_mut());

        let a = pool.acquire(PhysicalRange::new(0, 1)).unwrap();
        let b = pool.acquire(PhysicalRange::new(1, 2)).unwrap();
        assert_eq!(pool.available(), 0);
        assert_eq!(a.range(), PhysicalRange::new(0, 1));
        assert_eq!(b.range(), PhysicalRange::new(1, 2));

        assert_eq!(
            pool.acquire(PhysicalRange::new(2, 3)).unwrap_err(),
            BootAllocError::PoolExhausted { capacity: 2 }
        );

        pool.release(a);
        assert_eq!(pool.available(), 1);
        assert!(pool.acquire(PhysicalRange::new(2, 3)).is_ok());
    }

    #[test]
    fn storage_can_back_a_second_pool() {
        let mut storage = NodeStorage::<3>::new();
        {
            let mut pool = NodePool::new(storage.nodes_mut());
            let _held = pool.acquire(PhysicalRange::new(0, 1)).unwrap();
        }

        let pool = NodePool::new(storage.nodes_mut());
        assert_eq!(pool.available(), 3);
    }
}
