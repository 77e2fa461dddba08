#![allow(dead_code)]

use kernel_balloc::IntervalSet;
use kernel_info::boot::{MODULE_ENTRY_SIZE, MULTIBOOT_INFO_SIZE};

pub const FLAG_MODULES: u32 = 1 << 3;
pub const FLAG_MEMORY_MAP: u32 = 1 << 6;

pub const AVAILABLE: u32 = 1;
pub const RESERVED: u32 = 2;

/// Encode `(addr, length, type)` triples as a packed memory map.
pub fn mmap_bytes(entries: &[(u64, u64, u32)]) -> Vec<u8> {
    let mut buf = Vec::new();
    for &(addr, length, typ) in entries {
        buf.extend_from_slice(&20u32.to_le_bytes());
        buf.extend_from_slice(&addr.to_le_bytes());
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&typ.to_le_bytes());
    }
    buf
}

/// Encode a boot information record with the given flags and list sizes.
pub fn record(flags: u32, mmap_length: usize, mods_count: u32) -> [u8; MULTIBOOT_INFO_SIZE] {
    let mut bytes = [0u8; MULTIBOOT_INFO_SIZE];
    bytes[0..4].copy_from_slice(&flags.to_le_bytes());
    bytes[20..24].copy_from_slice(&mods_count.to_le_bytes());
    bytes[44..48].copy_from_slice(&u32::try_from(mmap_length).unwrap().to_le_bytes());
    bytes
}

/// Encode `(start, end)` pairs as a boot module list.
pub fn modules(extents: &[(u32, u32)]) -> Vec<u8> {
    let mut buf = Vec::new();
    for &(start, end) in extents {
        let mut entry = [0u8; MODULE_ENTRY_SIZE];
        entry[0..4].copy_from_slice(&start.to_le_bytes());
        entry[4..8].copy_from_slice(&end.to_le_bytes());
        buf.extend_from_slice(&entry);
    }
    buf
}

pub fn ranges(set: &IntervalSet<'_>) -> Vec<(u64, u64)> {
    set.iter().map(|r| (r.begin, r.end)).collect()
}

/// Panics unless neighbouring ranges are non-empty, disjoint and non-adjacent.
pub fn assert_coalesced(set: &IntervalSet<'_>) {
    let all: Vec<_> = set.iter().collect();
    for range in &all {
        assert!(range.begin < range.end, "empty range {range} in {set:?}");
    }
    for pair in all.windows(2) {
        assert!(
            pair[0].end < pair[1].begin,
            "{} and {} touch or overlap in {set:?}",
            pair[0],
            pair[1]
        );
    }
}
