//! # Early-Boot Physical Range Allocator
//!
//! This crate hands out physical memory between the moment the kernel gains
//! control and the moment a real frame allocator and heap are online. It is
//! used to place page tables and other early structures.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               Boot Map Ingestion                    │
//! │    • Multiboot memory map → both sets               │
//! │    • Reserved entries, kernel, initramfs → removed  │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │              Allocator Front-End                    │
//! │    • alloc / alloc_aligned / free / reserve         │
//! │    • Alignment policy and search windows            │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                Interval Sets                        │
//! │    • memory_map: everything ever reported           │
//! │    • free_ranges: what is left to hand out          │
//! │    • Coalescing insert, splitting remove            │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                  Node Pool                          │
//! │    • Fixed array of intrusive tree nodes            │
//! │    • O(1) acquire/release, no heap                  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Node Pool ([`pool`])
//! Interval nodes come from a [`NodeStorage`] array the caller provides,
//! typically a `static` sized by
//! [`EARLY_RANGE_CAPACITY`](kernel_info::memory::EARLY_RANGE_CAPACITY).
//! Running out of nodes is reported as [`BootAllocError::PoolExhausted`]; the
//! kernel cannot continue booting after that.
//!
//! ### Interval Sets ([`interval_set`])
//! Ordered, disjoint and fully coalesced sets of half-open ranges on top of an
//! intrusive red-black tree. Inserting merges touching neighbours, removing
//! splits ranges that stick out of the removed window.
//!
//! ### Allocator ([`allocator`])
//! First-fit search through the free ranges, honouring alignment and an
//! address window. Exhaustion is reported as [`BootAllocError::OutOfMemory`].
//!
//! ## Usage Patterns
//!
//! ```rust
//! use kernel_balloc::{BootAllocator, NodeStorage, PhysicalRange};
//! use kernel_info::memory::{MemoryMapEntry, MemoryRegionType};
//!
//! let map = [
//!     MemoryMapEntry { size: 20, addr: 0, length: 0x9_fc00, typ: MemoryRegionType::Available },
//!     MemoryMapEntry { size: 20, addr: 0x10_0000, length: 0xff0_0000, typ: MemoryRegionType::Available },
//! ];
//!
//! let mut storage = NodeStorage::<32>::new();
//! let mut balloc = BootAllocator::new(&mut storage);
//! balloc
//!     .ingest(map, PhysicalRange::new(0x10_0000, 0x20_0000), PhysicalRange::default())
//!     .unwrap();
//!
//! // A page table: 4 KiB, page aligned, below 4 GiB.
//! let table = balloc.alloc_aligned(4096, 4096, 0, 1 << 32).unwrap();
//! assert_eq!(table, 0);
//! assert_eq!(balloc.total_memory(), Some(0x1000_0000));
//! ```
//!
//! In the kernel the information record comes straight from the boot loader:
//!
//! ```rust,ignore
//! static mut NODES: NodeStorage<EARLY_RANGE_CAPACITY> = NodeStorage::new();
//!
//! let boot_info = unsafe { BootInfo::from_identity_mapped(mboot_info_addr)? };
//! let mut balloc = BootAllocator::new(unsafe { &mut *(&raw mut NODES) });
//! balloc.setup(&boot_info, kernel_image_extent())?;
//! ```
//!
//! ## Concurrency
//!
//! None. The allocator runs on the boot processor before interrupts or other
//! execution contexts exist and is passed around by `&mut`. Nothing in here
//! may be interleaved; a multi-context user must wrap the whole allocator in
//! one lock.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod allocator;
mod dump;
mod error;
mod ingest;
pub mod interval_set;
pub mod pool;
mod range;

pub use allocator::{BootAllocator, default_alignment};
pub use error::BootAllocError;
pub use interval_set::IntervalSet;
pub use pool::{IntervalNode, NodePool, NodeStorage};
pub use range::{PhysicalRange, align_up};
