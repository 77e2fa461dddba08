//! # Boot Allocator Front-End
//!
//! [`BootAllocator`] owns the node pool and both interval sets:
//!
//! * `memory_map`: every physical range the firmware ever reported
//! * `free_ranges`: the part of it that can still be handed out
//!
//! Later boot stages only ever talk to this type.

use crate::pool::{NodePool, NodeStorage};
use crate::{BootAllocError, IntervalSet, PhysicalRange};
use kernel_info::memory::{MAX_ALLOC_ALIGN, MIN_ALLOC_ALIGN};
use log::{debug, warn};

/// The early-boot physical range allocator.
pub struct BootAllocator<'a> {
    pub(crate) pool: NodePool<'a>,
    pub(crate) memory_map: IntervalSet<'a>,
    pub(crate) free_ranges: IntervalSet<'a>,
}

impl<'a> BootAllocator<'a> {
    /// Create an allocator with empty sets over the nodes of `storage`.
    ///
    /// The storage stays borrowed for as long as the allocator lives.
    pub fn new<const N: usize>(storage: &'a mut NodeStorage<N>) -> Self {
        Self {
            pool: NodePool::new(storage.nodes_mut()),
            memory_map: IntervalSet::new(),
            free_ranges: IntervalSet::new(),
        }
    }

    /// All physical memory known to exist, reserved or not.
    #[inline]
    #[must_use]
    pub const fn memory_map(&self) -> &IntervalSet<'a> {
        &self.memory_map
    }

    /// Physical memory still available for allocation.
    #[inline]
    #[must_use]
    pub const fn free_ranges(&self) -> &IntervalSet<'a> {
        &self.free_ranges
    }

    #[inline]
    #[must_use]
    pub const fn pool(&self) -> &NodePool<'a> {
        &self.pool
    }

    /// One past the highest known physical address, or `None` before setup.
    #[must_use]
    pub fn total_memory(&self) -> Option<u64> {
        self.memory_map.last().map(|range| range.end)
    }

    /// Number of bytes still available for allocation.
    #[must_use]
    pub fn free_memory(&self) -> u64 {
        self.free_ranges.covered_bytes()
    }

    /// Allocate `size` bytes inside `[from, to)` with the default alignment
    /// for that size (see [`default_alignment`]).
    ///
    /// # Errors
    /// See [`BootAllocator::alloc_aligned`].
    pub fn alloc(&mut self, size: u64, from: u64, to: u64) -> Result<u64, BootAllocError> {
        self.alloc_aligned(size, default_alignment(size), from, to)
    }

    /// Allocate `size` bytes aligned to `align` from the first free range
    /// (in address order) that can hold them inside `[from, to)`.
    ///
    /// # Errors
    /// - [`BootAllocError::InvalidAlignment`] if `align` is not a power of two.
    /// - [`BootAllocError::InvalidRange`] if `from > to`.
    /// - [`BootAllocError::OutOfMemory`] if no free range fits; nothing changes.
    /// - [`BootAllocError::PoolExhausted`] if the chosen range cannot be split.
    pub fn alloc_aligned(
        &mut self,
        size: u64,
        align: u64,
        from: u64,
        to: u64,
    ) -> Result<u64, BootAllocError> {
        if !align.is_power_of_two() {
            return Err(BootAllocError::InvalidAlignment(align));
        }
        let window = PhysicalRange::new(from, to).validate()?;

        let out_of_memory = BootAllocError::OutOfMemory {
            size,
            align,
            from,
            to,
        };
        if window.is_empty() {
            return Err(out_of_memory);
        }

        match self
            .free_ranges
            .allocate(&mut self.pool, size, align, window)?
        {
            Some(addr) => {
                debug!("Allocated {size:#x} bytes at {addr:#x} (align {align:#x})");
                Ok(addr)
            }
            None => {
                warn!("No free range fits {size:#x} bytes (align {align:#x}) in {window}");
                Err(out_of_memory)
            }
        }
    }

    /// Give `[begin, end)` back to the free ranges.
    ///
    /// There is no record of earlier allocations; any range not in use may be
    /// freed, including one that was never allocated.
    ///
    /// # Errors
    /// - [`BootAllocError::InvalidRange`] if `begin > end`.
    /// - [`BootAllocError::PoolExhausted`] if no node is left.
    pub fn free(&mut self, begin: u64, end: u64) -> Result<(), BootAllocError> {
        self.free_ranges
            .insert(&mut self.pool, PhysicalRange::new(begin, end))
    }

    /// Withdraw `[begin, end)` from the free ranges, e.g. for firmware tables
    /// discovered after setup. The memory map is not touched.
    ///
    /// # Errors
    /// - [`BootAllocError::InvalidRange`] if `begin > end`.
    /// - [`BootAllocError::PoolExhausted`] if a free range must be split and no node is left.
    pub fn reserve(&mut self, begin: u64, end: u64) -> Result<(), BootAllocError> {
        self.free_ranges
            .remove(&mut self.pool, PhysicalRange::new(begin, end))
    }
}

/// Alignment used by [`BootAllocator::alloc`] for a request of `size` bytes:
/// 8 up to 8 bytes, 16 up to 16, 32 up to 32 and 64 for everything larger.
///
/// Page tables and other page-aligned structures must ask for their alignment
/// explicitly through [`BootAllocator::alloc_aligned`].
#[must_use]
pub const fn default_alignment(size: u64) -> u64 {
    match size.checked_next_power_of_two() {
        Some(align) if align < MIN_ALLOC_ALIGN => MIN_ALLOC_ALIGN,
        Some(align) if align < MAX_ALLOC_ALIGN => align,
        _ => MAX_ALLOC_ALIGN,
    }
}
