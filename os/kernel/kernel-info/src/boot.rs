//! # Kernel Boot Information
//!
//! The Multiboot information record and the buffers it points to.

use crate::memory::MemoryMapIter;
use bitfield_struct::bitfield;
use core::ops::Range;

/// Number of record bytes decoded by [`MultibootInfo::parse`].
pub const MULTIBOOT_INFO_SIZE: usize = 52;

/// Size of a single entry in the boot module list.
pub const MODULE_ENTRY_SIZE: usize = 16;

/// Validity flags of the boot information record.
///
/// Each bit states whether the corresponding optional field was filled in by
/// the boot loader.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct InfoFlags {
    /// `mem_lower` and `mem_upper` are valid (bit 0).
    pub memory_bounds: bool,
    /// `boot_device` is valid (bit 1).
    pub boot_device: bool,
    /// `cmdline` is valid (bit 2).
    pub cmdline: bool,
    /// `mods_count` and `mods_addr` are valid (bit 3).
    pub modules: bool,
    /// a.out symbol table is valid (bit 4).
    pub aout_symbols: bool,
    /// ELF section header table is valid (bit 5).
    pub elf_sections: bool,
    /// `mmap_length` and `mmap_addr` are valid (bit 6).
    pub memory_map: bool,
    /// Drive list is valid (bit 7).
    pub drives: bool,
    /// ROM configuration table is valid (bit 8).
    pub config_table: bool,
    /// Boot loader name is valid (bit 9).
    pub boot_loader_name: bool,
    /// APM table is valid (bit 10).
    pub apm_table: bool,
    /// VBE information is valid (bit 11).
    pub vbe: bool,
    /// Framebuffer information is valid (bit 12).
    pub framebuffer: bool,
    #[bits(19)]
    __: u32,
}

/// Errors while decoding loader-provided boot data.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootInfoError {
    #[error("boot information record truncated: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
}

/// The fixed-layout prefix of the boot information record.
///
/// Fields the kernel never looks at (symbol tables, drives, VBE, ...) are not
/// decoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MultibootInfo {
    pub flags: InfoFlags,
    pub mem_lower: u32,
    pub mem_upper: u32,
    pub boot_device: u32,
    pub cmdline: u32,
    pub mods_count: u32,
    pub mods_addr: u32,
    /// Length of the memory map buffer in **bytes**.
    pub mmap_length: u32,
    /// Physical address of the memory map buffer.
    pub mmap_addr: u32,
}

impl MultibootInfo {
    /// Decode the record from its little-endian byte representation.
    ///
    /// # Errors
    /// [`BootInfoError::Truncated`] if fewer than [`MULTIBOOT_INFO_SIZE`] bytes are given.
    pub fn parse(bytes: &[u8]) -> Result<Self, BootInfoError> {
        if bytes.len() < MULTIBOOT_INFO_SIZE {
            return Err(BootInfoError::Truncated {
                needed: MULTIBOOT_INFO_SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            flags: InfoFlags::from_bits(read_u32(bytes, 0)),
            mem_lower: read_u32(bytes, 4),
            mem_upper: read_u32(bytes, 8),
            boot_device: read_u32(bytes, 12),
            cmdline: read_u32(bytes, 16),
            mods_count: read_u32(bytes, 20),
            mods_addr: read_u32(bytes, 24),
            mmap_length: read_u32(bytes, 44),
            mmap_addr: read_u32(bytes, 48),
        })
    }

    /// Whether the loader provided a memory map.
    #[inline]
    #[must_use]
    pub const fn has_memory_map(&self) -> bool {
        self.flags.memory_map()
    }

    /// Whether the loader provided a boot module list.
    #[inline]
    #[must_use]
    pub const fn has_modules(&self) -> bool {
        self.flags.modules()
    }
}

/// A file the boot loader placed in physical memory.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BootModule {
    pub start: u32,
    pub end: u32,
    /// Physical address of the module's command line.
    pub cmdline: u32,
}

impl BootModule {
    /// The physical extent `[start, end)` of the module.
    #[inline]
    #[must_use]
    pub fn range(&self) -> Range<u64> {
        u64::from(self.start)..u64::from(self.end)
    }
}

/// Iterator over the boot module list.
#[derive(Debug, Clone)]
pub struct ModuleIter<'a> {
    chunks: core::slice::ChunksExact<'a, u8>,
}

impl Iterator for ModuleIter<'_> {
    type Item = BootModule;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.chunks.next()?;
        Some(BootModule {
            start: read_u32(raw, 0),
            end: read_u32(raw, 4),
            cmdline: read_u32(raw, 8),
        })
    }
}

/// The boot information record together with the buffers it refers to.
#[derive(Debug, Copy, Clone)]
pub struct BootInfo<'a> {
    header: MultibootInfo,
    memory_map: &'a [u8],
    modules: &'a [u8],
}

impl<'a> BootInfo<'a> {
    /// Bundle an already decoded record with its memory map and module list bytes.
    #[must_use]
    pub const fn new(header: MultibootInfo, memory_map: &'a [u8], modules: &'a [u8]) -> Self {
        Self {
            header,
            memory_map,
            modules,
        }
    }

    /// Decode the record the boot loader left at physical address `addr`.
    ///
    /// Buffers whose validity flag is clear are treated as empty.
    ///
    /// # Safety
    /// - `addr` must point to a valid Multiboot information record.
    /// - Physical memory must be identity-mapped, and the record, memory map
    ///   and module list must stay untouched for the rest of the kernel's life.
    ///
    /// # Errors
    /// Never in practice; the record read is always [`MULTIBOOT_INFO_SIZE`] bytes long.
    #[allow(unsafe_code, clippy::cast_possible_truncation)]
    pub unsafe fn from_identity_mapped(addr: u64) -> Result<BootInfo<'static>, BootInfoError> {
        let record =
            unsafe { core::slice::from_raw_parts(addr as usize as *const u8, MULTIBOOT_INFO_SIZE) };
        let header = MultibootInfo::parse(record)?;

        let memory_map: &'static [u8] = if header.has_memory_map() {
            unsafe {
                core::slice::from_raw_parts(
                    header.mmap_addr as usize as *const u8,
                    header.mmap_length as usize,
                )
            }
        } else {
            &[]
        };

        let modules: &'static [u8] = if header.has_modules() {
            unsafe {
                core::slice::from_raw_parts(
                    header.mods_addr as usize as *const u8,
                    header.mods_count as usize * MODULE_ENTRY_SIZE,
                )
            }
        } else {
            &[]
        };

        Ok(BootInfo::new(header, memory_map, modules))
    }

    #[inline]
    #[must_use]
    pub const fn header(&self) -> &MultibootInfo {
        &self.header
    }

    /// Iterate the raw memory map entries.
    ///
    /// This does not consult [`InfoFlags::memory_map`]; callers decide what a
    /// missing map means.
    #[must_use]
    pub const fn memory_map(&self) -> MemoryMapIter<'a> {
        MemoryMapIter::new(self.memory_map)
    }

    /// Iterate the boot modules, or nothing if the loader did not provide any.
    #[must_use]
    pub fn modules(&self) -> ModuleIter<'a> {
        let bytes = if self.header.has_modules() {
            self.modules
        } else {
            &[]
        };
        ModuleIter {
            chunks: bytes.chunks_exact(MODULE_ENTRY_SIZE),
        }
    }

    /// Physical extent of the initramfs, the first boot module.
    ///
    /// Returns the empty range `0..0` when no module was loaded.
    #[must_use]
    pub fn initramfs(&self) -> Range<u64> {
        self.modules().next().map_or(0..0, |module| module.range())
    }
}

/// Read a little-endian `u32` at `offset`. The caller checked the length.
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

/// Read a little-endian `u64` at `offset`. The caller checked the length.
pub(crate) fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}
