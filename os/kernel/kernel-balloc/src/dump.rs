//! Diagnostic dump of the allocator state.

use crate::{BootAllocator, IntervalSet};
use log::info;

impl BootAllocator<'_> {
    /// Log every known and every free range, in address order.
    pub fn dump_ranges(&self) {
        info!("known memory ranges:");
        dump_set(&self.memory_map);
        info!("free memory ranges:");
        dump_set(&self.free_ranges);
    }
}

fn dump_set(set: &IntervalSet<'_>) {
    for range in set.iter() {
        info!("memory range: {range}");
    }
}
