mod common;

use common::{
    AVAILABLE, FLAG_MEMORY_MAP, FLAG_MODULES, RESERVED, assert_coalesced, mmap_bytes, modules,
    ranges, record,
};
use kernel_balloc::{BootAllocError, BootAllocator, NodeStorage, PhysicalRange};
use kernel_info::boot::{BootInfo, MultibootInfo};
use kernel_info::memory::{MemoryMapEntry, MemoryRegionType};

const KERNEL: PhysicalRange = PhysicalRange::new(0x10_0000, 0x20_0000);

fn entry(addr: u64, length: u64, typ: MemoryRegionType) -> MemoryMapEntry {
    MemoryMapEntry {
        size: 20,
        addr,
        length,
        typ,
    }
}

#[test]
fn typical_pc_memory_map() {
    let mmap = mmap_bytes(&[
        (0, 0x9_fc00, AVAILABLE),
        (0x9_fc00, 0x6_0400, RESERVED),
        (0x10_0000, 0xff0_0000, AVAILABLE),
    ]);
    let mods = modules(&[(0x20_0000, 0x21_0000)]);
    let header = MultibootInfo::parse(&record(FLAG_MEMORY_MAP | FLAG_MODULES, mmap.len(), 1)).unwrap();
    let boot_info = BootInfo::new(header, &mmap, &mods);

    let mut storage = NodeStorage::<32>::new();
    let mut balloc = BootAllocator::new(&mut storage);
    balloc.setup(&boot_info, KERNEL).unwrap();

    assert_eq!(ranges(balloc.memory_map()), [(0, 0x1000_0000)]);
    assert_eq!(
        ranges(balloc.free_ranges()),
        [(0, 0x9_fc00), (0x21_0000, 0x1000_0000)]
    );
    assert_eq!(balloc.total_memory(), Some(0x1000_0000));
    assert_coalesced(balloc.memory_map());
    assert_coalesced(balloc.free_ranges());

    // Nothing handed out may touch the kernel or the initramfs.
    let addr = balloc.alloc_aligned(0x1000, 0x1000, 0x9_f000, u64::MAX).unwrap();
    assert_eq!(addr, 0x21_0000);
}

#[test]
fn missing_memory_map_is_fatal() {
    let header = MultibootInfo::parse(&record(FLAG_MODULES, 0, 0)).unwrap();
    let boot_info = BootInfo::new(header, &[], &[]);

    let mut storage = NodeStorage::<8>::new();
    let mut balloc = BootAllocator::new(&mut storage);

    assert_eq!(
        balloc.setup(&boot_info, KERNEL),
        Err(BootAllocError::MissingMemoryMap {
            flags: FLAG_MODULES
        })
    );
    assert!(balloc.memory_map().is_empty());
    assert!(balloc.free_ranges().is_empty());
}

#[test]
fn without_modules_only_the_kernel_is_reserved() {
    let mmap = mmap_bytes(&[(0, 0x100_0000, AVAILABLE)]);
    let header = MultibootInfo::parse(&record(FLAG_MEMORY_MAP, mmap.len(), 0)).unwrap();
    let boot_info = BootInfo::new(header, &mmap, &[]);

    let mut storage = NodeStorage::<8>::new();
    let mut balloc = BootAllocator::new(&mut storage);
    balloc.setup(&boot_info, KERNEL).unwrap();

    assert_eq!(
        ranges(balloc.free_ranges()),
        [(0, 0x10_0000), (0x20_0000, 0x100_0000)]
    );
}

#[test]
fn reserved_wins_over_overlapping_available() {
    // The reserved entry comes first and is overlapped by a later available one.
    let map = [
        entry(0x8000, 0x1000, MemoryRegionType::Reserved),
        entry(0, 0x10_0000, MemoryRegionType::Available),
        entry(0xf_0000, 0x2_0000, MemoryRegionType::AcpiNvs),
    ];

    let mut storage = NodeStorage::<16>::new();
    let mut balloc = BootAllocator::new(&mut storage);
    balloc
        .ingest(map, PhysicalRange::default(), PhysicalRange::default())
        .unwrap();

    assert_eq!(ranges(balloc.memory_map()), [(0, 0x11_0000)]);
    assert_eq!(ranges(balloc.free_ranges()), [(0, 0x8000), (0x9000, 0xf_0000)]);
}

#[test]
fn kernel_outside_the_map_is_still_known() {
    let map = [entry(0, 0x8_0000, MemoryRegionType::Available)];

    let mut storage = NodeStorage::<8>::new();
    let mut balloc = BootAllocator::new(&mut storage);
    balloc
        .ingest(map, KERNEL, PhysicalRange::default())
        .unwrap();

    assert_eq!(ranges(balloc.memory_map()), [(0, 0x8_0000), (0x10_0000, 0x20_0000)]);
    assert_eq!(ranges(balloc.free_ranges()), [(0, 0x8_0000)]);
    assert_eq!(balloc.total_memory(), Some(0x20_0000));
}

#[test]
fn zero_length_entries_are_skipped() {
    let mmap = mmap_bytes(&[
        (0x5000, 0, AVAILABLE),
        (0, 0x1000, AVAILABLE),
        (0x500, 0, RESERVED),
    ]);
    let header = MultibootInfo::parse(&record(FLAG_MEMORY_MAP, mmap.len(), 0)).unwrap();
    let boot_info = BootInfo::new(header, &mmap, &[]);

    let mut storage = NodeStorage::<8>::new();
    let mut balloc = BootAllocator::new(&mut storage);
    balloc
        .setup(&boot_info, PhysicalRange::new(0x1000, 0x2000))
        .unwrap();

    assert_eq!(ranges(balloc.memory_map()), [(0, 0x2000)]);
    assert_eq!(ranges(balloc.free_ranges()), [(0, 0x1000)]);
}

#[test]
fn oversized_entries_are_stepped_over() {
    // An entry announcing 28 bytes of payload: 8 trailing bytes to skip.
    let mut mmap = Vec::new();
    mmap.extend_from_slice(&28u32.to_le_bytes());
    mmap.extend_from_slice(&0u64.to_le_bytes());
    mmap.extend_from_slice(&0x4000u64.to_le_bytes());
    mmap.extend_from_slice(&AVAILABLE.to_le_bytes());
    mmap.extend_from_slice(&[0xff; 8]);
    mmap.extend_from_slice(&mmap_bytes(&[(0x8000, 0x4000, AVAILABLE)]));

    let header = MultibootInfo::parse(&record(FLAG_MEMORY_MAP, mmap.len(), 0)).unwrap();
    let boot_info = BootInfo::new(header, &mmap, &[]);

    let mut storage = NodeStorage::<8>::new();
    let mut balloc = BootAllocator::new(&mut storage);
    balloc.setup(&boot_info, PhysicalRange::default()).unwrap();

    assert_eq!(ranges(balloc.free_ranges()), [(0, 0x4000), (0x8000, 0xc000)]);
}

#[test]
fn entries_past_the_address_space_are_cut() {
    let map = [entry(0xffff_ffff_ffff_0000, 0x2_0000, MemoryRegionType::Available)];

    let mut storage = NodeStorage::<8>::new();
    let mut balloc = BootAllocator::new(&mut storage);
    balloc
        .ingest(map, PhysicalRange::default(), PhysicalRange::default())
        .unwrap();

    assert_eq!(
        ranges(balloc.free_ranges()),
        [(0xffff_ffff_ffff_0000, u64::MAX)]
    );
}

#[test]
fn fragmented_map_exhausts_small_pool() {
    let map: Vec<_> = (0..8)
        .map(|i| entry(i * 0x2000, 0x1000, MemoryRegionType::Available))
        .collect();

    let mut storage = NodeStorage::<8>::new();
    let mut balloc = BootAllocator::new(&mut storage);

    assert_eq!(
        balloc.ingest(map, PhysicalRange::default(), PhysicalRange::default()),
        Err(BootAllocError::PoolExhausted { capacity: 8 })
    );
}

#[test]
fn reversed_extents_are_rejected_before_any_change() {
    let map = [
        entry(0, 0x1000, MemoryRegionType::Available),
        entry(0x400, 0x100, MemoryRegionType::Reserved),
    ];

    let mut storage = NodeStorage::<8>::new();
    let mut balloc = BootAllocator::new(&mut storage);

    assert_eq!(
        balloc.ingest(map, PhysicalRange::default(), PhysicalRange::new(0x800, 0x400)),
        Err(BootAllocError::InvalidRange {
            begin: 0x800,
            end: 0x400
        })
    );
    assert_eq!(
        balloc.ingest(map, PhysicalRange::new(0x2000, 0x1000), PhysicalRange::default()),
        Err(BootAllocError::InvalidRange {
            begin: 0x2000,
            end: 0x1000
        })
    );
    assert!(balloc.memory_map().is_empty());
    assert!(balloc.free_ranges().is_empty());
    assert_eq!(balloc.pool().available(), 8);
}

#[test]
fn reversed_boot_module_is_ignored() {
    let mmap = mmap_bytes(&[(0, 0x100_0000, AVAILABLE)]);
    let mods = modules(&[(0x21_0000, 0x20_0000)]);
    let header = MultibootInfo::parse(&record(FLAG_MEMORY_MAP | FLAG_MODULES, mmap.len(), 1)).unwrap();
    let boot_info = BootInfo::new(header, &mmap, &mods);

    let mut storage = NodeStorage::<8>::new();
    let mut balloc = BootAllocator::new(&mut storage);
    balloc.setup(&boot_info, KERNEL).unwrap();

    assert_eq!(ranges(balloc.memory_map()), [(0, 0x100_0000)]);
    assert_eq!(
        ranges(balloc.free_ranges()),
        [(0, 0x10_0000), (0x20_0000, 0x100_0000)]
    );
}
