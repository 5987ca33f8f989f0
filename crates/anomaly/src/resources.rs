use sysinfo::{Networks, System};

/// Source of host resource readings.
pub trait ResourceSampler: Send {
    /// Global CPU utilization, in percent.
    fn cpu_usage(&mut self) -> f32;

    /// Total bytes received over all network interfaces since boot.
    fn total_received(&mut self) -> u64;
}

/// Reads resources from the operating system.
pub struct SystemSampler {
    system: System,
    networks: Networks,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler for SystemSampler {
    fn cpu_usage(&mut self) -> f32 {
        // Usage is computed between two refreshes, the first reading is 0
        self.system.refresh_cpu();
        self.system.global_cpu_info().cpu_usage()
    }

    fn total_received(&mut self) -> u64 {
        self.networks.refresh();
        self.networks
            .iter()
            .map(|(_, data)| data.total_received())
            .sum()
    }
}
