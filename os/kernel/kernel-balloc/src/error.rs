use kernel_info::boot::BootInfoError;

/// Errors of the early physical range allocator.
///
/// Except for [`BootAllocError::OutOfMemory`], all of these mean the kernel
/// cannot continue booting: there is no degraded mode this early.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootAllocError {
    /// The interval node pool ran dry; the capacity constant is too small
    /// for the fragmentation of this machine's memory map.
    #[error("interval node pool exhausted (capacity {capacity}), increase EARLY_RANGE_CAPACITY")]
    PoolExhausted { capacity: usize },
    /// The boot loader did not hand over a memory map.
    #[error("boot information carries no memory map (flags {flags:#010x})")]
    MissingMemoryMap { flags: u32 },
    /// No free range satisfies the request inside the search window.
    #[error("no free range fits {size:#x} bytes aligned to {align:#x} in {from:#x}-{to:#x}")]
    OutOfMemory {
        size: u64,
        align: u64,
        from: u64,
        to: u64,
    },
    #[error("alignment {0:#x} is not a power of two")]
    InvalidAlignment(u64),
    #[error("invalid range {begin:#x}-{end:#x}")]
    InvalidRange { begin: u64, end: u64 },
    #[error(transparent)]
    BootInfo(#[from] BootInfoError),
}
