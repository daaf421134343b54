use crate::{error::Result, model::NetworkCounters};
use sysinfo::Networks;

/// Cumulative byte counters summed over every interface
pub struct NetworkCollector {
    networks: Networks,
}

impl NetworkCollector {
    pub fn new() -> Result<Self> {
        let networks = Networks::new_with_refreshed_list();

        Ok(Self { networks })
    }

    /// Totals since boot. These are raw counters, not deltas.
    pub fn collect(&mut self) -> Result<NetworkCounters> {
        #[cfg(feature = "linux_procfs")]
        {
            self.collect_procfs()
        }

        #[cfg(not(feature = "linux_procfs"))]
        {
            self.collect_sysinfo()
        }
    }

    #[cfg_attr(feature = "linux_procfs", allow(dead_code))]
    fn collect_sysinfo(&mut self) -> Result<NetworkCounters> {
        // Pick up interfaces that appeared since the last tick
        self.networks.refresh_list();
        self.networks.refresh();

        Ok(sum_counters(self.networks.iter().map(|(_, data)| {
            (data.total_transmitted(), data.total_received())
        })))
    }

    #[cfg(feature = "linux_procfs")]
    fn collect_procfs(&mut self) -> Result<NetworkCounters> {
        let devices = procfs::net::dev_status()?;

        Ok(sum_counters(
            devices
                .values()
                .map(|device| (device.sent_bytes, device.recv_bytes)),
        ))
    }
}

fn sum_counters<I>(per_interface: I) -> NetworkCounters
where
    I: IntoIterator<Item = (u64, u64)>,
{
    per_interface
        .into_iter()
        .fold(NetworkCounters::default(), |mut total, (sent, recv)| {
            total.bytes_sent = total.bytes_sent.saturating_add(sent);
            total.bytes_recv = total.bytes_recv.saturating_add(recv);
            total
        })
}
