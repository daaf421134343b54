pub mod cpu;
pub mod disk;
pub mod memory;
pub mod network;

pub use cpu::CpuCollector;
pub use disk::DiskCollector;
pub use memory::MemoryCollector;
pub use network::NetworkCollector;

use crate::{
    error::Result,
    model::{MetricToggles, NetworkCounters, Readings},
};

/// Source of host readings, one operation per metric kind.
///
/// Each call is a read of current OS state. Errors surface the underlying
/// query failure and abort the whole tick.
pub trait Sampler {
    /// CPU utilization percentage since the previous call
    fn cpu_percent(&mut self) -> Result<f64>;

    /// Percentage of physical memory in use
    fn memory_percent(&mut self) -> Result<f64>;

    /// Percentage of the root filesystem in use
    fn disk_percent(&mut self) -> Result<f64>;

    /// Cumulative bytes sent/received since boot
    fn network_counters(&mut self) -> Result<NetworkCounters>;

    /// Read every enabled metric, skipping the disabled ones entirely
    fn sample(&mut self, toggles: &MetricToggles) -> Result<Readings> {
        let mut readings = Readings::default();

        if toggles.cpu {
            readings.cpu_percent = Some(self.cpu_percent()?);
        }
        if toggles.memory {
            readings.memory_percent = Some(self.memory_percent()?);
        }
        if toggles.disk {
            readings.disk_percent = Some(self.disk_percent()?);
        }
        if toggles.network {
            readings.network = Some(self.network_counters()?);
        }

        Ok(readings)
    }
}

/// Sampler backed by the real host, coordinating the per-kind collectors
pub struct SystemSampler {
    cpu: CpuCollector,
    memory: MemoryCollector,
    disk: DiskCollector,
    network: NetworkCollector,
}

impl SystemSampler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cpu: CpuCollector::new()?,
            memory: MemoryCollector::new()?,
            disk: DiskCollector::new()?,
            network: NetworkCollector::new()?,
        })
    }
}

impl Sampler for SystemSampler {
    fn cpu_percent(&mut self) -> Result<f64> {
        self.cpu.collect()
    }

    fn memory_percent(&mut self) -> Result<f64> {
        self.memory.collect()
    }

    fn disk_percent(&mut self) -> Result<f64> {
        self.disk.collect()
    }

    fn network_counters(&mut self) -> Result<NetworkCounters> {
        self.network.collect()
    }
}
