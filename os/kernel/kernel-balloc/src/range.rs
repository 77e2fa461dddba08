//! Half-open physical address ranges.

use crate::BootAllocError;
use core::fmt;
use core::ops::Range;

/// A half-open range `[begin, end)` of physical addresses.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysicalRange {
    /// First address in the range.
    pub begin: u64,
    /// First address past the range.
    pub end: u64,
}

impl PhysicalRange {
    #[inline]
    #[must_use]
    pub const fn new(begin: u64, end: u64) -> Self {
        Self { begin, end }
    }

    /// A range is empty if it covers no address, including reversed ranges.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    /// Number of bytes covered, zero for empty ranges.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.begin)
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, addr: u64) -> bool {
        self.begin <= addr && addr < self.end
    }

    /// Reject reversed ranges. Empty ranges with `begin == end` pass.
    pub(crate) const fn validate(self) -> Result<Self, BootAllocError> {
        if self.begin > self.end {
            return Err(BootAllocError::InvalidRange {
                begin: self.begin,
                end: self.end,
            });
        }
        Ok(self)
    }
}

impl From<Range<u64>> for PhysicalRange {
    fn from(value: Range<u64>) -> Self {
        Self::new(value.start, value.end)
    }
}

impl From<PhysicalRange> for Range<u64> {
    fn from(value: PhysicalRange) -> Self {
        value.begin..value.end
    }
}

impl fmt::Display for PhysicalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}-{:#x}", self.begin, self.end)
    }
}

impl fmt::Debug for PhysicalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Align `addr` upwards to `align` (must be a power of two).
///
/// Returns `None` if the aligned address does not fit into 64 bits.
#[inline]
#[must_use]
pub const fn align_up(addr: u64, align: u64) -> Option<u64> {
    let mask = align - 1;
    match addr.checked_add(mask) {
        Some(sum) => Some(sum & !mask),
        None => None,
    }
}
