//! # Memory Map and Early Allocation Configuration

use crate::boot::{read_u32, read_u64};

/// Number of interval nodes reserved for the early physical range allocator.
///
/// Every disjoint range in the known memory map and in the free range set
/// consumes one node. Firmware maps with many holes need a larger pool.
pub const EARLY_RANGE_CAPACITY: usize = 128;

/// Smallest alignment handed out by the early allocator's default policy.
pub const MIN_ALLOC_ALIGN: u64 = 8;

/// Largest alignment handed out by the early allocator's default policy.
///
/// Covers cache lines; callers needing page alignment ask for it explicitly.
pub const MAX_ALLOC_ALIGN: u64 = 64;

/// Number of bytes a memory map entry occupies at minimum.
pub const MEMORY_MAP_ENTRY_SIZE: usize = 24;

/// Raw type code of memory that is free for the OS to use.
pub const MULTIBOOT_MEMORY_AVAILABLE: u32 = 1;

const _: () = {
    assert!(MIN_ALLOC_ALIGN.is_power_of_two());
    assert!(MAX_ALLOC_ALIGN.is_power_of_two());
    assert!(MIN_ALLOC_ALIGN <= MAX_ALLOC_ALIGN);
    assert!(EARLY_RANGE_CAPACITY >= 2);
};

/// Type of a memory map region as reported by the boot loader.
///
/// Only [`MemoryRegionType::Available`] may be handed out; everything else,
/// including codes this kernel does not know, is treated as reserved.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemoryRegionType {
    /// Usable RAM (type 1).
    Available,
    /// Reserved by firmware (type 2).
    Reserved,
    /// ACPI tables, reclaimable once parsed (type 3).
    AcpiReclaimable,
    /// ACPI non-volatile storage (type 4).
    AcpiNvs,
    /// RAM reported as defective (type 5).
    Defective,
    /// Any other type code.
    Unknown(u32),
}

impl MemoryRegionType {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            MULTIBOOT_MEMORY_AVAILABLE => Self::Available,
            2 => Self::Reserved,
            3 => Self::AcpiReclaimable,
            4 => Self::AcpiNvs,
            5 => Self::Defective,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::Available => MULTIBOOT_MEMORY_AVAILABLE,
            Self::Reserved => 2,
            Self::AcpiReclaimable => 3,
            Self::AcpiNvs => 4,
            Self::Defective => 5,
            Self::Unknown(other) => other,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// One decoded memory map entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryMapEntry {
    /// Size of the entry in bytes, **excluding** the size field itself.
    pub size: u32,
    /// Physical start address.
    pub addr: u64,
    /// Length of the region in bytes.
    pub length: u64,
    pub typ: MemoryRegionType,
}

impl MemoryMapEntry {
    /// Exclusive end address of the region, saturated at `u64::MAX`.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.addr.saturating_add(self.length)
    }

    /// Whether `addr + length` does not fit into 64 bits.
    #[inline]
    #[must_use]
    pub const fn overflows(&self) -> bool {
        self.addr.checked_add(self.length).is_none()
    }

    /// Decode an entry from the start of `bytes`, or `None` if fewer than
    /// [`MEMORY_MAP_ENTRY_SIZE`] bytes remain.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < MEMORY_MAP_ENTRY_SIZE {
            return None;
        }

        Some(Self {
            size: read_u32(bytes, 0),
            addr: read_u64(bytes, 4),
            length: read_u64(bytes, 12),
            typ: MemoryRegionType::from_raw(read_u32(bytes, 20)),
        })
    }
}

/// Iterator over the packed memory map buffer.
///
/// Entries are not fixed-width: each one is followed by the next at
/// `size + 4` bytes from its start. Iteration stops once fewer than
/// [`MEMORY_MAP_ENTRY_SIZE`] bytes remain.
#[derive(Debug, Clone)]
pub struct MemoryMapIter<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> MemoryMapIter<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }
}

impl Iterator for MemoryMapIter<'_> {
    type Item = MemoryMapEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = MemoryMapEntry::decode(self.bytes.get(self.offset..)?)?;
        let stride = (entry.size as usize).saturating_add(size_of::<u32>());
        self.offset = self.offset.saturating_add(stride);
        Some(entry)
    }
}
