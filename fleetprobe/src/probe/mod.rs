//! Vendor probe strategies.
//!
//! A [`Probe`] wraps one [`Device`] for one run. It knows how to phrase a
//! count-limited ping in the device's CLI dialect, how long to wait between
//! commands, and how to read the device's ping report back into a
//! [`ReachabilityMap`].
//!
//! The built-in strategies live in [`vendors`]; [`vendors::probe_for`] picks
//! one from the device kind, falling back to the generic POSIX strategy.

pub mod parse;
pub mod vendors;

use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use log::{debug, info};

use crate::channel::SessionExecutor;
use crate::device::Device;
use crate::error::Result;
use crate::transport::{PtySize, SshConfig};

/// Destination address → reachable, in the device's configured order.
pub type ReachabilityMap = IndexMap<String, bool>;

/// A map with every destination marked unreachable.
pub fn unreachable_map(destinations: &[String]) -> ReachabilityMap {
    destinations
        .iter()
        .map(|destination| (destination.clone(), false))
        .collect()
}

/// Run-wide knobs shared by every probe.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// TCP connect and SSH authentication timeout.
    pub connect_timeout: Duration,

    /// Bound on one device's shell session; `None` waits indefinitely.
    pub session_timeout: Option<Duration>,

    /// PTY to request before starting the shell.
    pub pty: Option<PtySize>,

    /// Pause after each command, overriding the vendor default.
    pub command_delay: Option<Duration>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            session_timeout: Some(Duration::from_secs(300)),
            pty: None,
            command_delay: None,
        }
    }
}

impl ProbeSettings {
    /// Settings with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set or clear the session deadline.
    pub fn session_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Request a PTY of the given size.
    pub fn pty(mut self, pty: PtySize) -> Self {
        self.pty = Some(pty);
        self
    }

    /// Override the vendor's pause between commands.
    pub fn command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = Some(delay);
        self
    }

    /// Build the executor that will talk to `device`.
    pub fn executor_for(&self, device: &Device) -> SessionExecutor {
        let config = SshConfig::for_device(device)
            .with_timeout(self.connect_timeout)
            .with_pty(self.pty);

        SessionExecutor::new(config).with_session_timeout(self.session_timeout)
    }
}

/// Vendor-specific probing behavior for one device.
pub trait Probe: Send + Sync {
    /// The device being probed.
    fn device(&self) -> &Device;

    /// Run-wide settings.
    fn settings(&self) -> &ProbeSettings;

    /// Pause after each command when the settings do not override it.
    fn default_delay(&self) -> Duration;

    /// Build the command sequence that pings every destination.
    fn build_commands(&self, destinations: &[String]) -> Vec<String>;

    /// Read the captured session output back into a reachability map.
    ///
    /// Must return exactly `destinations` as keys.
    fn parse(&self, raw: &str, destinations: &[String]) -> ReachabilityMap;

    /// Source identity of this probe's results.
    fn source(&self) -> &str {
        &self.device().address
    }

    /// Destinations to ping.
    fn destinations(&self) -> &[String] {
        &self.device().destinations
    }

    /// Effective pause after each command.
    fn command_delay(&self) -> Duration {
        self.settings()
            .command_delay
            .unwrap_or_else(|| self.default_delay())
    }

    /// Log in, run the pings and parse the output.
    fn run(&self) -> BoxFuture<'_, Result<ReachabilityMap>> {
        async move {
            let device = self.device();
            let destinations = self.destinations();
            let commands = self.build_commands(destinations);

            info!(
                "probing {} ({}, {}) for {} destinations",
                device.name,
                device.kind,
                self.source(),
                destinations.len()
            );

            let raw = self
                .settings()
                .executor_for(device)
                .execute(&commands, self.command_delay())
                .await?;

            debug!("{}: parsing {} bytes of output", device.name, raw.len());
            Ok(self.parse(&raw, destinations))
        }
        .boxed()
    }
}
