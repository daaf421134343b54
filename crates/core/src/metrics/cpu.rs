use crate::error::Result;
use sysinfo::System;

pub struct CpuCollector {
    sys: System,
}

impl CpuCollector {
    pub fn new() -> Result<Self> {
        let mut sys = System::new();
        // Baseline measurement, usage is computed against the previous refresh
        sys.refresh_cpu();

        Ok(Self { sys })
    }

    /// Overall CPU usage across all cores since the previous call.
    ///
    /// The first call after construction may report a degenerate value when
    /// less than `sysinfo::MINIMUM_CPU_UPDATE_INTERVAL` has elapsed.
    pub fn collect(&mut self) -> Result<f64> {
        self.sys.refresh_cpu();

        let usage = self.sys.global_cpu_info().cpu_usage();
        Ok(f64::from(usage))
    }
}
