//! # Interval Sets
//!
//! An [`IntervalSet`] is an ordered collection of disjoint physical ranges kept
//! in a red-black tree keyed by the first address of each range.
//!
//! ## Invariant
//!
//! After every mutation, two neighbouring ranges `A` and `B` (in that order)
//! satisfy `A.end < B.begin`: they neither overlap nor touch. The set is
//! always in maximally coalesced form, and the end addresses grow in the same
//! order as the start addresses. The searches below rely on that.
//!
//! ## Operations
//!
//! ```text
//! insert [30,50) into { [0,30) [50,60) [70,80) }
//!   link new node      [0,30) [30,50) [50,60) [70,80)
//!   absorb predecessor [0,50)         [50,60) [70,80)
//!   absorb successors  [0,60)                 [70,80)
//!
//! remove [20,75) from { [0,60) [70,80) }
//!   erase overlapped   -
//!   re-insert remains  [0,20) [75,80)
//! ```

use crate::pool::{IntervalNode, NodePool, TreeAdapter};
use crate::range::align_up;
use crate::{BootAllocError, PhysicalRange};
use core::fmt;
use core::marker::PhantomData;
use intrusive_collections::rbtree::CursorMut;
use intrusive_collections::{Bound, RBTree};
use log::trace;

/// Disjoint, coalesced set of physical ranges.
///
/// Nodes are borrowed from a [`NodePool`] with the same lifetime; every
/// mutating operation takes that pool so it can acquire and release nodes.
pub struct IntervalSet<'a> {
    tree: RBTree<TreeAdapter>,
    _nodes: PhantomData<&'a IntervalNode>,
}

impl<'a> IntervalSet<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: RBTree::new(TreeAdapter::new()),
            _nodes: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Number of disjoint ranges (and thus nodes) in the set.
    ///
    /// This walks the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.iter().count()
    }

    /// Ranges in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = PhysicalRange> + '_ {
        self.tree.iter().map(IntervalNode::range)
    }

    /// The lowest range.
    #[must_use]
    pub fn first(&self) -> Option<PhysicalRange> {
        self.tree.front().get().map(IntervalNode::range)
    }

    /// The highest range.
    #[must_use]
    pub fn last(&self) -> Option<PhysicalRange> {
        self.tree.back().get().map(IntervalNode::range)
    }

    /// Sum of the lengths of all ranges.
    #[must_use]
    pub fn covered_bytes(&self) -> u64 {
        self.iter().map(|range| range.len()).sum()
    }

    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        self.tree
            .upper_bound(Bound::Included(&addr))
            .get()
            .is_some_and(|node| node.end() > addr)
    }

    /// Whether one range of the set contains all of `range`.
    fn covers(&self, range: PhysicalRange) -> bool {
        self.tree
            .upper_bound(Bound::Included(&range.begin))
            .get()
            .is_some_and(|node| node.end() >= range.end)
    }

    /// Add `range` to the set, merging it with every range it touches or overlaps.
    ///
    /// Inserting an empty range, or one a single existing range already
    /// covers, does nothing and takes no node from the pool.
    ///
    /// # Errors
    /// - [`BootAllocError::InvalidRange`] if `range.begin > range.end`.
    /// - [`BootAllocError::PoolExhausted`] if the range is not yet covered and no
    ///   node is left, even if it would merge with its neighbours; the set is
    ///   unchanged.
    pub(crate) fn insert(
        &mut self,
        pool: &mut NodePool<'a>,
        range: PhysicalRange,
    ) -> Result<(), BootAllocError> {
        if range.validate()?.is_empty() || self.covers(range) {
            return Ok(());
        }
        trace!("Inserting range {range}");

        let node = pool.acquire(range)?;
        let new = node.clone();

        // Existing ranges starting at `range.begin` end up after the new node.
        let mut cursor = self.tree.lower_bound_mut(Bound::Included(&range.begin));
        cursor.insert_before(node);
        cursor.move_prev();

        cursor.move_prev();
        match cursor.get().map(IntervalNode::range) {
            Some(prev) if prev.end >= new.begin() => {
                // Removing moves the cursor back onto the new node.
                if let Some(prev_node) = cursor.remove() {
                    pool.release(prev_node);
                }
                new.set_begin(prev.begin);
                new.set_end(prev.end.max(new.end()));
            }
            // From the predecessor (or the null element before the front), the
            // next element is the new node.
            _ => cursor.move_next(),
        }

        cursor.move_next();
        while let Some(next) = cursor.get().map(IntervalNode::range) {
            if next.begin > new.end() {
                break;
            }
            if let Some(next_node) = cursor.remove() {
                pool.release(next_node);
            }
            new.set_end(next.end.max(new.end()));
        }

        Ok(())
    }

    /// Remove `range` from the set, splitting ranges that extend past either end.
    ///
    /// Removing an empty range, or a range the set does not cover, does nothing.
    ///
    /// # Errors
    /// - [`BootAllocError::InvalidRange`] if `range.begin > range.end`.
    /// - [`BootAllocError::PoolExhausted`] if a range must be split in two and no
    ///   node is left; the set is unchanged.
    pub(crate) fn remove(
        &mut self,
        pool: &mut NodePool<'a>,
        range: PhysicalRange,
    ) -> Result<(), BootAllocError> {
        if range.validate()?.is_empty() {
            return Ok(());
        }
        trace!("Removing range {range}");

        let mut cursor = self.first_overlapping_mut(range.begin);

        // Punching a hole into a single range needs one node more than it frees.
        if let Some(first) = cursor.get().map(IntervalNode::range)
            && first.begin < range.begin
            && first.end > range.end
            && pool.available() == 0
        {
            return Err(pool.exhausted());
        }

        // Only the first visited range can keep a head, only the last a tail.
        let mut head = None;
        let mut tail = None;
        while let Some(node) = cursor.get().map(IntervalNode::range) {
            if node.begin >= range.end {
                break;
            }
            if node.begin < range.begin {
                head = Some(PhysicalRange::new(node.begin, range.begin));
            }
            if node.end > range.end {
                tail = Some(PhysicalRange::new(range.end, node.end));
            }
            if let Some(erased) = cursor.remove() {
                pool.release(erased);
            }
        }

        for remainder in [head, tail].into_iter().flatten() {
            self.insert(pool, remainder)?;
        }

        Ok(())
    }

    /// Carve the first block of `size` bytes aligned to `align` out of the part
    /// of the set that lies inside `window`.
    ///
    /// Returns `Ok(None)` if nothing fits. `align` must be a power of two.
    ///
    /// # Errors
    /// [`BootAllocError::PoolExhausted`] if the chosen range must be split in two
    /// and no node is left; the set is unchanged.
    pub(crate) fn allocate(
        &mut self,
        pool: &mut NodePool<'a>,
        size: u64,
        align: u64,
        window: PhysicalRange,
    ) -> Result<Option<u64>, BootAllocError> {
        debug_assert!(align.is_power_of_two());

        let mut cursor = self.first_overlapping_mut(window.begin);
        let mut fit = None;
        while let Some(candidate) = cursor.get().map(IntervalNode::range) {
            if candidate.begin >= window.end {
                break;
            }

            let begin = candidate.begin.max(window.begin);
            let end = candidate.end.min(window.end);
            if let Some(addr) = align_up(begin, align)
                && let Some(block_end) = addr.checked_add(size)
                && block_end <= end
            {
                fit = Some((candidate, PhysicalRange::new(addr, block_end)));
                break;
            }

            cursor.move_next();
        }

        let Some((candidate, block)) = fit else {
            return Ok(None);
        };

        if candidate.begin < block.begin && candidate.end > block.end && pool.available() == 0 {
            return Err(pool.exhausted());
        }

        if let Some(erased) = cursor.remove() {
            pool.release(erased);
        }
        self.insert(pool, PhysicalRange::new(candidate.begin, block.begin))?;
        self.insert(pool, PhysicalRange::new(block.end, candidate.end))?;

        trace!("Allocated {block} from {candidate}");
        Ok(Some(block.begin))
    }

    /// Cursor on the leftmost range whose end lies above `from`, i.e. the first
    /// range that can overlap anything starting at `from`.
    ///
    /// Since ends are ordered like starts, this is the last range starting at
    /// or below `from` if it reaches past `from`, and its successor otherwise.
    fn first_overlapping_mut(&mut self, from: u64) -> CursorMut<'_, TreeAdapter> {
        let mut cursor = self.tree.upper_bound_mut(Bound::Included(&from));
        if cursor.get().is_none_or(|node| node.end() <= from) {
            // From the null element this wraps to the front.
            cursor.move_next();
        }
        cursor
    }
}

impl Default for IntervalSet<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntervalSet<'_> {
    fn drop(&mut self) {
        // Nodes belong to the pool's storage; only forget about them here.
        self.tree.fast_clear();
    }
}

impl fmt::Debug for IntervalSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
