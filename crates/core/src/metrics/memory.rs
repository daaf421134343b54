use crate::error::{CoreError, Result};
use sysinfo::System;

pub struct MemoryCollector {
    sys: System,
}

impl MemoryCollector {
    pub fn new() -> Result<Self> {
        let sys = System::new();

        Ok(Self { sys })
    }

    /// Percentage of physical memory in use
    pub fn collect(&mut self) -> Result<f64> {
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        let used = self.sys.used_memory();

        used_percent(used, total)
            .ok_or_else(|| CoreError::system_info("total memory reported as zero"))
    }
}

pub(crate) fn used_percent(used: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(used as f64 / total as f64 * 100.0)
}
