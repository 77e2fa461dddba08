//! # Kernel Boot Interface
//!
//! This crate defines the data structures the kernel reads from the boot
//! loader before any of its own memory management exists, together with the
//! compile-time configuration of the early physical range allocator.
//!
//! ## Overview
//!
//! The kernel is loaded by a Multiboot (version 1) compliant boot loader. On
//! entry, the loader leaves the physical address of a *boot information
//! record* in a register. That record describes, among other things:
//!
//! * **Memory Map**: a densely packed list of physical ranges and their types
//! * **Boot Modules**: files the loader placed in memory (e.g. the initramfs)
//!
//! Everything here is plain decoding. The allocator that consumes the decoded
//! map lives in `kernel-balloc`.
//!
//! ## Architecture
//!
//! ### Boot Information ([`boot`])
//! * **[`MultibootInfo`](boot::MultibootInfo)**: the fixed-layout record prefix
//! * **[`InfoFlags`](boot::InfoFlags)**: which optional record fields are valid
//! * **[`BootInfo`](boot::BootInfo)**: the record plus the memory-map and module
//!   buffers it points to
//!
//! ### Memory Map ([`memory`])
//! * **[`MemoryMapEntry`](memory::MemoryMapEntry)**: one self-describing entry
//! * **[`MemoryMapIter`](memory::MemoryMapIter)**: steps over entries using each
//!   entry's own size field
//! * **Configuration**: node pool capacity and alignment policy bounds
//!
//! ## Wire Format
//!
//! ```text
//! Boot information record (little endian):
//!  0 ┌──────────────┐
//!    │ flags        │  bit 3: modules valid, bit 6: memory map valid
//!  4 ├──────────────┤
//!    │ mem_lower .. │  ignored
//! 20 ├──────────────┤
//!    │ mods_count   │
//! 24 ├──────────────┤
//!    │ mods_addr    │
//! 28 ├──────────────┤
//!    │ symbols ..   │  ignored
//! 44 ├──────────────┤
//!    │ mmap_length  │
//! 48 ├──────────────┤
//!    │ mmap_addr    │
//! 52 └──────────────┘
//!
//! Memory map entry:
//!  0 size (u32)  │  4 addr (u64)  │  12 length (u64)  │  20 type (u32)
//!  next entry at offset size + 4
//! ```
//!
//! ## Usage Patterns
//!
//! ```rust
//! use kernel_info::boot::{BootInfo, MultibootInfo};
//!
//! let mut record = [0u8; 52];
//! record[0] = 1 << 6; // memory map present
//!
//! let mut mmap = [0u8; 24];
//! mmap[0..4].copy_from_slice(&20u32.to_le_bytes());
//! mmap[12..20].copy_from_slice(&0x9_fc00u64.to_le_bytes());
//! mmap[20..24].copy_from_slice(&1u32.to_le_bytes());
//!
//! let header = MultibootInfo::parse(&record).unwrap();
//! let info = BootInfo::new(header, &mmap, &[]);
//! assert!(info.header().has_memory_map());
//!
//! let entry = info.memory_map().next().unwrap();
//! assert_eq!(entry.end(), 0x9_fc00);
//! assert!(entry.typ.is_available());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod memory;
