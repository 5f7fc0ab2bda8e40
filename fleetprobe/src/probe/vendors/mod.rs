//! Built-in probe strategies.

pub mod arista;
pub mod cisco;
pub mod linux;

use std::sync::Arc;

use log::warn;

pub use arista::AristaProbe;
pub use cisco::CiscoProbe;
pub use linux::LinuxProbe;

use super::{Probe, ProbeSettings};
use crate::device::{Device, DeviceKind};

/// Pick the strategy for a device's kind.
///
/// Unrecognised kinds are probed as generic POSIX hosts.
pub fn probe_for(device: Arc<Device>, settings: &ProbeSettings) -> Arc<dyn Probe> {
    let settings = settings.clone();
    let kind = device.kind.clone();
    match kind {
        DeviceKind::Linux => Arc::new(LinuxProbe::new(device, settings)),
        DeviceKind::AristaEos => Arc::new(AristaProbe::new(device, settings)),
        DeviceKind::CiscoIos => Arc::new(CiscoProbe::new(device, settings)),
        DeviceKind::Other(tag) => {
            warn!(
                "{}: unknown device type '{}', probing as linux",
                device.name, tag
            );
            Arc::new(LinuxProbe::new(device, settings))
        }
    }
}
