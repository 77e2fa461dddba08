//! # Boot Map Ingestion
//!
//! Firmware memory maps are not always consistent: regions may overlap, and
//! an overlapping pair may disagree on whether the memory is usable. The map
//! is therefore processed in two passes:
//!
//! 1. every region goes into **both** sets, whatever its type
//! 2. every region that is not available is removed from `free_ranges`
//!
//! Because removal runs last, memory reported as reserved by *any* entry
//! never ends up free, no matter in which order the firmware listed it.

use crate::{BootAllocError, BootAllocator, PhysicalRange};
use kernel_info::boot::BootInfo;
use kernel_info::memory::MemoryMapEntry;
use log::{debug, error, info, warn};

impl BootAllocator<'_> {
    /// Populate both sets from the boot loader's information record.
    ///
    /// `kernel_image` is the physical extent of the loaded kernel, from the
    /// start of its code to the end of its uninitialized data. The initramfs
    /// extent is taken from the boot module list. Call this once, right after
    /// [`BootAllocator::new`].
    ///
    /// # Errors
    /// - [`BootAllocError::MissingMemoryMap`] if the record has no memory map.
    /// - [`BootAllocError::PoolExhausted`] if the map is too fragmented for the pool.
    pub fn setup(
        &mut self,
        boot_info: &BootInfo<'_>,
        kernel_image: PhysicalRange,
    ) -> Result<(), BootAllocError> {
        let header = boot_info.header();
        if !header.has_memory_map() {
            let flags = header.flags.into_bits();
            error!("Boot loader did not provide a memory map (flags {flags:#010x})");
            return Err(BootAllocError::MissingMemoryMap { flags });
        }

        let mut initramfs = PhysicalRange::from(boot_info.initramfs());
        if initramfs.begin > initramfs.end {
            warn!("Ignoring boot module with reversed extent {initramfs}");
            initramfs = PhysicalRange::default();
        }
        self.ingest(boot_info.memory_map(), kernel_image, initramfs)?;
        self.dump_ranges();

        info!(
            "Early allocator ready: {:#x} bytes known, {:#x} bytes free, {} of {} nodes in use",
            self.memory_map.covered_bytes(),
            self.free_ranges.covered_bytes(),
            self.pool.capacity() - self.pool.available(),
            self.pool.capacity()
        );
        Ok(())
    }

    /// Populate both sets from decoded memory map entries.
    ///
    /// `entries` is walked twice. Zero-length entries are skipped, and entries
    /// whose end does not fit into 64 bits are cut at `u64::MAX`.
    ///
    /// # Errors
    /// - [`BootAllocError::InvalidRange`] if `kernel_image` or `boot_module` is
    ///   reversed; both sets are left untouched.
    /// - [`BootAllocError::PoolExhausted`] if the map is too fragmented for the pool.
    pub fn ingest<I>(
        &mut self,
        entries: I,
        kernel_image: PhysicalRange,
        boot_module: PhysicalRange,
    ) -> Result<(), BootAllocError>
    where
        I: IntoIterator<Item = MemoryMapEntry>,
        I::IntoIter: Clone,
    {
        let kernel_image = kernel_image.validate()?;
        let boot_module = boot_module.validate()?;
        let entries = entries.into_iter();

        for entry in entries.clone() {
            debug!(
                "Memory map entry {:#x}+{:#x} type {:?}",
                entry.addr, entry.length, entry.typ
            );
            if entry.length == 0 {
                warn!("Skipping empty memory map entry at {:#x}", entry.addr);
                continue;
            }
            if entry.overflows() {
                warn!(
                    "Memory map entry {:#x}+{:#x} wraps the address space, truncating",
                    entry.addr, entry.length
                );
            }

            let range = entry_range(&entry);
            self.memory_map.insert(&mut self.pool, range)?;
            self.free_ranges.insert(&mut self.pool, range)?;
        }

        self.memory_map.insert(&mut self.pool, kernel_image)?;
        self.free_ranges.insert(&mut self.pool, kernel_image)?;

        for entry in entries.filter(|entry| !entry.typ.is_available()) {
            self.free_ranges.remove(&mut self.pool, entry_range(&entry))?;
        }

        debug!("Reserving boot module {boot_module} and kernel image {kernel_image}");
        self.free_ranges.remove(&mut self.pool, boot_module)?;
        self.free_ranges.remove(&mut self.pool, kernel_image)?;

        Ok(())
    }
}

fn entry_range(entry: &MemoryMapEntry) -> PhysicalRange {
    PhysicalRange::new(entry.addr, entry.end())
}
