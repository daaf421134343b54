use crate::error::{CoreError, Result};
use std::path::{Path, PathBuf};

/// Usage of the filesystem holding the root mount
pub struct DiskCollector {
    root: PathBuf,
    #[cfg(not(unix))]
    disks: sysinfo::Disks,
}

impl DiskCollector {
    pub fn new() -> Result<Self> {
        Self::for_path("/")
    }

    /// Collector for the filesystem containing `path`
    pub fn for_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            root: path.as_ref().to_path_buf(),
            #[cfg(not(unix))]
            disks: sysinfo::Disks::new_with_refreshed_list(),
        })
    }

    /// Percentage of the filesystem in use
    pub fn collect(&mut self) -> Result<f64> {
        let usage = self.read_usage()?;
        usage.percent().ok_or_else(|| {
            CoreError::system_info(format!(
                "filesystem at {} reports zero capacity",
                self.root.display()
            ))
        })
    }

    #[cfg(unix)]
    fn read_usage(&mut self) -> Result<FsUsage> {
        let stat = nix::sys::statvfs::statvfs(self.root.as_path())?;
        let fragment = stat.fragment_size() as u64;

        Ok(FsUsage {
            total: stat.blocks() as u64 * fragment,
            free: stat.blocks_free() as u64 * fragment,
            available: stat.blocks_available() as u64 * fragment,
        })
    }

    #[cfg(not(unix))]
    fn read_usage(&mut self) -> Result<FsUsage> {
        self.disks.refresh_list();

        let disk = self
            .disks
            .iter()
            .find(|disk| disk.mount_point() == self.root.as_path())
            .or_else(|| self.disks.iter().min_by_key(|disk| disk.mount_point().as_os_str().len()))
            .ok_or_else(|| CoreError::system_info("no disks reported"))?;

        let total = disk.total_space();
        let available = disk.available_space();
        Ok(FsUsage {
            total,
            free: available,
            available,
        })
    }
}

/// Raw filesystem sizes in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FsUsage {
    total: u64,
    free: u64,
    available: u64,
}

impl FsUsage {
    /// Used share of the space usable by unprivileged users, the same figure
    /// `df` prints. Blocks reserved for root are left out of the denominator.
    fn percent(&self) -> Option<f64> {
        let used = self.total.saturating_sub(self.free);
        let usable = used + self.available;
        if usable == 0 {
            return None;
        }
        Some(used as f64 / usable as f64 * 100.0)
    }
}
