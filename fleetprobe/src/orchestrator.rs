//! Concurrent fleet probing.
//!
//! [`Orchestrator::run`] spawns one task per device, all at once. Every task
//! reports exactly one outcome on a shared queue, and a single collector
//! builds the [`FleetReport`], so no probe ever touches the aggregate
//! directly. A device that fails contributes an empty map plus its error;
//! it never stops the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::device::Device;
use crate::error::{Error, ProbeError, Result};
use crate::probe::vendors::probe_for;
use crate::probe::{Probe, ProbeSettings, ReachabilityMap};

/// One device's result, as sent to the collector.
#[derive(Debug)]
struct ProbeOutcome {
    source: String,
    result: Result<ReachabilityMap>,
}

/// Aggregate result of one fleet run.
#[derive(Debug, Default)]
pub struct FleetReport {
    /// Source address → reachability map, in completion order. Devices that
    /// failed map to an empty map.
    pub results: IndexMap<String, ReachabilityMap>,

    /// Source address → why that device could not be probed.
    pub errors: IndexMap<String, Error>,

    /// Wall time of the whole run.
    pub elapsed: Duration,
}

impl FleetReport {
    /// Reachability map for one source address.
    pub fn get(&self, source: &str) -> Option<&ReachabilityMap> {
        self.results.get(source)
    }

    /// Sources that could not be probed, with the reason.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.errors.iter().map(|(source, e)| (source.as_str(), e))
    }

    /// Destinations a source could not reach.
    pub fn unreachable(&self, source: &str) -> Vec<&str> {
        self.results
            .get(source)
            .map(|map| {
                map.iter()
                    .filter(|(_, reachable)| !**reachable)
                    .map(|(destination, _)| destination.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether every device was probed without error.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, outcome: ProbeOutcome) {
        let ProbeOutcome { source, result } = outcome;
        match result {
            Ok(map) => {
                let reachable = map.values().filter(|r| **r).count();
                info!("{}: {}/{} destinations reachable", source, reachable, map.len());
                self.results.insert(source, map);
            }
            Err(e) => {
                warn!("{}: probe failed: {}", source, e);
                self.results.insert(source.clone(), ReachabilityMap::new());
                self.errors.insert(source, e);
            }
        }
    }
}

/// Runs every probe of a fleet concurrently.
pub struct Orchestrator {
    probes: Vec<Arc<dyn Probe>>,
}

impl Orchestrator {
    /// Create an orchestrator for `probes`.
    ///
    /// Results are keyed by source address, so two probes sharing one are
    /// rejected instead of silently overwriting each other.
    pub fn new(probes: Vec<Arc<dyn Probe>>) -> Result<Self> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for probe in &probes {
            let name = probe.device().name.as_str();
            if let Some(first) = seen.insert(probe.source(), name) {
                return Err(ProbeError::DuplicateSource {
                    address: probe.source().to_string(),
                    first: first.to_string(),
                    second: name.to_string(),
                }
                .into());
            }
        }

        Ok(Self { probes })
    }

    /// Select a strategy for each device and create an orchestrator.
    pub fn from_devices<I>(devices: I, settings: &ProbeSettings) -> Result<Self>
    where
        I: IntoIterator<Item = Device>,
    {
        let probes = devices
            .into_iter()
            .map(|device| probe_for(Arc::new(device), settings))
            .collect();

        Self::new(probes)
    }

    /// Number of probes.
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// Check if there is nothing to probe.
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Probe every device and wait for all of them.
    pub async fn run(self) -> FleetReport {
        let start = Instant::now();
        let (tx, mut rx) = mpsc::channel(self.probes.len().max(1));

        info!("probing {} devices", self.probes.len());

        let mut tasks = Vec::with_capacity(self.probes.len());
        for probe in self.probes {
            let tx = tx.clone();
            let source = probe.source().to_string();
            let handle = tokio::spawn(async move {
                let result = probe.run().await;
                let outcome = ProbeOutcome {
                    source: probe.source().to_string(),
                    result,
                };
                // The collector outlives every task.
                let _ = tx.send(outcome).await;
            });
            tasks.push((source, handle));
        }
        drop(tx);

        let mut report = FleetReport::default();
        while let Some(outcome) = rx.recv().await {
            debug!("collected result for {}", outcome.source);
            report.record(outcome);
        }

        // A task that panicked never reported; account for it here.
        for (source, handle) in tasks {
            if let Err(e) = handle.await {
                report.record(ProbeOutcome {
                    source: source.clone(),
                    result: Err(ProbeError::TaskFailed {
                        address: source,
                        message: e.to_string(),
                    }
                    .into()),
                });
            }
        }

        report.elapsed = start.elapsed();
        info!(
            "probed {} devices in {:?} ({} failed)",
            report.results.len(),
            report.elapsed,
            report.errors.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use futures_util::FutureExt;
    use futures_util::future::BoxFuture;

    use super::*;
    use crate::device::DeviceKind;
    use crate::error::TransportError;
    use crate::probe::parse;
    use crate::probe::vendors::linux::ping_command;

    enum Behavior {
        Output(&'static str),
        Refused,
        Panic,
    }

    /// Stands in for a device: waits `latency`, then behaves as told.
    struct FakeProbe {
        device: Device,
        settings: ProbeSettings,
        latency: Duration,
        behavior: Behavior,
    }

    impl FakeProbe {
        fn arc(address: &str, destinations: &[&str], latency: u64, behavior: Behavior) -> Arc<dyn Probe> {
            let device = Device::new(format!("dev-{address}"), DeviceKind::Linux, address)
                .destinations(destinations.iter().copied());
            Arc::new(Self {
                device,
                settings: ProbeSettings::default(),
                latency: Duration::from_secs(latency),
                behavior,
            })
        }
    }

    impl Probe for FakeProbe {
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

        fn run(&self) -> BoxFuture<'_, Result<ReachabilityMap>> {
            async move {
                tokio::time::sleep(self.latency).await;
                match self.behavior {
                    Behavior::Output(raw) => Ok(self.parse(raw, self.destinations())),
                    Behavior::Refused => Err(TransportError::ConnectionFailed {
                        host: self.source().to_string(),
                        port: 22,
                        source: io::Error::from(io::ErrorKind::ConnectionRefused),
                    }
                    .into()),
                    Behavior::Panic => panic!("probe crashed"),
                }
            }
            .boxed()
        }
    }

    const GOOD: &str = "PING 8.8.8.8 (8.8.8.8)\n3 packets transmitted, 3 received, 0% packet loss, time 2ms\n";
    const MIXED: &str = "\
PING 8.8.8.8 (8.8.8.8)\n3 packets transmitted, 3 received, 0% packet loss, time 2ms
PING 10.0.0.9 (10.0.0.9)\n3 packets transmitted, 0 received, 100% packet loss, time 2ms
";

    #[tokio::test(start_paused = true)]
    async fn test_two_devices_aggregate() {
        let orchestrator = Orchestrator::new(vec![
            FakeProbe::arc("10.0.0.1", &["8.8.8.8", "10.0.0.9"], 1, Behavior::Output(MIXED)),
            FakeProbe::arc("10.0.0.2", &["8.8.8.8"], 2, Behavior::Output(GOOD)),
        ])
        .unwrap();

        let report = orchestrator.run().await;

        assert_eq!(report.results.len(), 2);
        assert!(report.is_complete());
        assert_eq!(
            report.get("10.0.0.1"),
            Some(&ReachabilityMap::from([
                ("8.8.8.8".to_string(), true),
                ("10.0.0.9".to_string(), false),
            ]))
        );
        assert_eq!(
            report.get("10.0.0.2"),
            Some(&ReachabilityMap::from([("8.8.8.8".to_string(), true)]))
        );
        assert_eq!(report.unreachable("10.0.0.1"), vec!["10.0.0.9"]);
        assert!(report.unreachable("10.0.0.2").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_run_concurrently() {
        let probes = (1..=8)
            .map(|i| FakeProbe::arc(&format!("10.0.1.{i}"), &["8.8.8.8"], 3, Behavior::Output(GOOD)))
            .collect();

        let report = Orchestrator::new(probes).unwrap().run().await;

        assert_eq!(report.results.len(), 8);
        // Bounded by the slowest device, not the sum
        assert!(report.elapsed >= Duration::from_secs(3));
        assert!(report.elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_isolated() {
        let report = Orchestrator::new(vec![
            FakeProbe::arc("10.0.0.1", &["8.8.8.8"], 1, Behavior::Refused),
            FakeProbe::arc("10.0.0.2", &["8.8.8.8"], 2, Behavior::Output(GOOD)),
        ])
        .unwrap()
        .run()
        .await;

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.get("10.0.0.1"), Some(&ReachabilityMap::new()));
        assert_eq!(report.get("10.0.0.2").unwrap()["8.8.8.8"], true);

        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "10.0.0.1");
        assert!(matches!(
            failed[0].1,
            Error::Transport(TransportError::ConnectionFailed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_probe_is_reported() {
        let report = Orchestrator::new(vec![
            FakeProbe::arc("10.0.0.1", &["8.8.8.8"], 1, Behavior::Panic),
            FakeProbe::arc("10.0.0.2", &["8.8.8.8"], 1, Behavior::Output(GOOD)),
        ])
        .unwrap()
        .run()
        .await;

        assert_eq!(report.results.len(), 2);
        assert!(matches!(
            report.errors.get("10.0.0.1"),
            Some(Error::Probe(ProbeError::TaskFailed { .. }))
        ));
        assert_eq!(report.get("10.0.0.2").unwrap()["8.8.8.8"], true);
    }

    #[test]
    fn test_duplicate_source_is_rejected() {
        let result = Orchestrator::new(vec![
            FakeProbe::arc("10.0.0.1", &[], 0, Behavior::Output("")),
            FakeProbe::arc("10.0.0.1", &[], 0, Behavior::Output("")),
        ]);

        match result {
            Err(Error::Probe(ProbeError::DuplicateSource { address, .. })) => {
                assert_eq!(address, "10.0.0.1");
            }
            _ => panic!("expected duplicate source error"),
        }
    }

    #[tokio::test]
    async fn test_empty_fleet() {
        let orchestrator = Orchestrator::new(Vec::new()).unwrap();
        assert!(orchestrator.is_empty());
        let report = orchestrator.run().await;
        assert!(report.results.is_empty());
        assert!(report.is_complete());
    }

    #[test]
    fn test_from_devices() {
        let devices = vec![
            Device::new("h1", DeviceKind::Linux, "10.0.0.1").destination("8.8.8.8"),
            Device::new("sw1", DeviceKind::AristaEos, "10.0.0.2").destination("8.8.8.8"),
            Device::new("r1", DeviceKind::from_tag("cisco_ios"), "10.0.0.3"),
        ];

        let orchestrator = Orchestrator::from_devices(devices, &ProbeSettings::default()).unwrap();
        assert_eq!(orchestrator.len(), 3);
    }
}
