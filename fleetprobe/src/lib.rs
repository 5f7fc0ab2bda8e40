//! # Fleetprobe
//!
//! Concurrent ping-reachability probing for multi-vendor network fleets.
//!
//! Fleetprobe logs into every device of a fleet over SSH, runs the device's
//! own `ping` for each configured destination, and scrapes the CLI output
//! into a destination → reachable map per device.
//!
//! ## Features
//!
//! - Async SSH sessions via russh, with legacy algorithms enabled for older
//!   network operating systems
//! - Password and keyboard-interactive authentication
//! - Vendor strategies for Linux hosts, Arista EOS and Cisco IOS, with a
//!   generic POSIX fallback for unknown device types
//! - One concurrent task per device; one failing device never stalls the rest
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fleetprobe::{Device, DeviceKind, Orchestrator, ProbeSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fleetprobe::Error> {
//!     let devices = vec![
//!         Device::new("core-1", DeviceKind::AristaEos, "10.0.0.1")
//!             .username("admin")
//!             .password("secret")
//!             .destinations(["8.8.8.8", "10.0.0.9"]),
//!     ];
//!
//!     let report = Orchestrator::from_devices(devices, &ProbeSettings::default())?
//!         .run()
//!         .await;
//!
//!     for (source, results) in &report.results {
//!         for (destination, reachable) in results {
//!             println!("{source} -> {destination}: {reachable}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod device;
pub mod error;
pub mod orchestrator;
pub mod probe;
pub mod transport;

// Re-export main types for convenience
pub use channel::SessionExecutor;
pub use device::{Device, DeviceKind};
pub use error::Error;
pub use orchestrator::{FleetReport, Orchestrator};
pub use probe::{Probe, ProbeSettings, ReachabilityMap};
pub use transport::{PtySize, SshConfig};
