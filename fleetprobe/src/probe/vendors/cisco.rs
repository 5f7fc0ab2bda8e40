//! Cisco IOS probe.
//!
//! IOS reports a success rate rather than a loss figure, so the parser's
//! polarity is inverted relative to the POSIX probes. The pause between
//! commands is longer because IOS waits out the full timeout per echo.

use std::sync::Arc;
use std::time::Duration;

use crate::device::Device;
use crate::probe::{Probe, ProbeSettings, ReachabilityMap, parse};

/// Seconds IOS waits for each echo reply.
pub const ECHO_TIMEOUT_SECS: u32 = 1;

/// Echo requests per destination.
pub const REPEAT_COUNT: u32 = 3;

/// Probe for Cisco IOS routers.
#[derive(Debug)]
pub struct CiscoProbe {
    device: Arc<Device>,
    settings: ProbeSettings,
}

impl CiscoProbe {
    /// Create a probe for `device`.
    pub fn new(device: Arc<Device>, settings: ProbeSettings) -> Self {
        Self { device, settings }
    }
}

impl Probe for CiscoProbe {
    fn device(&self) -> &Device {
        &self.device
    }

    fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    fn default_delay(&self) -> Duration {
        Duration::from_secs(3)
    }

    fn build_commands(&self, destinations: &[String]) -> Vec<String> {
        destinations
            .iter()
            .map(|d| format!("ping {d} timeout {ECHO_TIMEOUT_SECS} r {REPEAT_COUNT}"))
            .collect()
    }

    fn parse(&self, raw: &str, destinations: &[String]) -> ReachabilityMap {
        parse::success_rate(raw, destinations)
    }
}
