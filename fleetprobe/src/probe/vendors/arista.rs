//! Arista EOS probe.
//!
//! EOS needs privileged EXEC before `ping` accepts a repeat count, so the
//! sequence opens with `en`. The report itself is the Linux iputils format.

use std::sync::Arc;
use std::time::Duration;

use crate::device::Device;
use crate::probe::{Probe, ProbeSettings, ReachabilityMap, parse};

/// Command that enters privileged EXEC mode.
pub const ENABLE_COMMAND: &str = "en";

/// Echo requests per destination.
pub const REPEAT_COUNT: u32 = 3;

/// Probe for Arista EOS switches.
#[derive(Debug)]
pub struct AristaProbe {
    device: Arc<Device>,
    settings: ProbeSettings,
}

impl AristaProbe {
    /// Create a probe for `device`.
    pub fn new(device: Arc<Device>, settings: ProbeSettings) -> Self {
        Self { device, settings }
    }
}

impl Probe for AristaProbe {
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
        std::iter::once(ENABLE_COMMAND.to_string())
            .chain(
                destinations
                    .iter()
                    .map(|d| format!("ping {d} repeat {REPEAT_COUNT}")),
            )
            .collect()
    }

    fn parse(&self, raw: &str, destinations: &[String]) -> ReachabilityMap {
        parse::packet_loss(raw, destinations)
    }
}
