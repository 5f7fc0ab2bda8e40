//! Generic POSIX probe.
//!
//! Used for Linux hosts and for any device kind that has no dedicated
//! strategy: `ping <ip> -c 3` per destination, scored by packet loss.

use std::sync::Arc;
use std::time::Duration;

use crate::device::Device;
use crate::probe::{Probe, ProbeSettings, ReachabilityMap, parse};

/// Echo requests per destination.
pub const PING_COUNT: u32 = 3;

/// Probe for POSIX shells.
#[derive(Debug)]
pub struct LinuxProbe {
    device: Arc<Device>,
    settings: ProbeSettings,
}

impl LinuxProbe {
    /// Create a probe for `device`.
    pub fn new(device: Arc<Device>, settings: ProbeSettings) -> Self {
        Self { device, settings }
    }
}

/// The ping invocation for one destination.
pub fn ping_command(destination: &str) -> String {
    format!("ping {destination} -c {PING_COUNT}")
}

impl Probe for LinuxProbe {
    fn device(&self) -> &Device {
        &self.device
    }

    fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    fn default_delay(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn build_commands(&self, destinations: &[String]) -> Vec<String> {
        destinations.iter().map(|d| ping_command(d)).collect()
    }

    fn parse(&self, raw: &str, destinations: &[String]) -> ReachabilityMap {
        parse::packet_loss(raw, destinations)
    }
}
