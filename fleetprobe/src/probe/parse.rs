//! Ping report scrapers.
//!
//! Pure functions from captured CLI text to a [`ReachabilityMap`]. The text
//! is cut into one block per ping invocation at a vendor-specific marker, and
//! each block yields at most one (destination, reachable) pair. Destinations
//! without a usable block stay unreachable, and addresses that were not asked
//! for are ignored.

use std::sync::LazyLock;

use log::trace;
use regex::Regex;

use super::{ReachabilityMap, unreachable_map};

/// Marker preceding each POSIX-style ping report (`PING 8.8.8.8 (8.8.8.8) ...`).
pub const POSIX_BLOCK_MARKER: &str = "PING";

/// Marker preceding each IOS echo report (`Sending 3, 100-byte ICMP Echos to ...`).
pub const IOS_BLOCK_MARKER: &str = "Echos";

const OCTET: &str = r"(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])";

static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?:{OCTET}\.){{3}}{OCTET}\b")).expect("IPv4 pattern is valid")
});

/// IPv4 address immediately followed by a comma (`Echos to 1.1.1.1, timeout`).
static IPV4_COMMA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b((?:{OCTET}\.){{3}}{OCTET}),")).expect("IPv4 pattern is valid")
});

/// `0% packet loss`, `100% packet loss`, `0.0% packet loss`.
static PACKET_LOSS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3}(?:\.\d+)?)%\s+packet\s+loss").expect("packet loss pattern is valid")
});

/// `Success rate is 100 percent (3/3)`.
static PERCENT_SUCCESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3})\s+percent\s+\(").expect("percent success pattern is valid")
});

/// Parse POSIX / EOS `ping` output: zero packet loss means reachable.
pub fn packet_loss(raw: &str, destinations: &[String]) -> ReachabilityMap {
    scrape(raw, destinations, POSIX_BLOCK_MARKER, |block| {
        let address = IPV4.find(block)?.as_str();
        let loss: f64 = PACKET_LOSS.captures(block)?[1].parse().ok()?;
        Some((address, loss == 0.0))
    })
}

/// Parse IOS `ping` output: any nonzero success rate means reachable.
///
/// The polarity is the reverse of [`packet_loss`] because IOS reports how
/// many echoes came back rather than how many were lost.
pub fn success_rate(raw: &str, destinations: &[String]) -> ReachabilityMap {
    scrape(raw, destinations, IOS_BLOCK_MARKER, |block| {
        let address = IPV4_COMMA.captures(block)?.get(1)?.as_str();
        let success: u32 = PERCENT_SUCCESS.captures(block)?[1].parse().ok()?;
        Some((address, success != 0))
    })
}

fn scrape<'a, F>(raw: &'a str, destinations: &[String], marker: &str, verdict: F) -> ReachabilityMap
where
    F: Fn(&'a str) -> Option<(&'a str, bool)>,
{
    let mut map = unreachable_map(destinations);

    for block in raw.split(marker) {
        let Some((address, reachable)) = verdict(block) else {
            continue;
        };
        match map.get_mut(address) {
            Some(slot) => *slot = reachable,
            None => trace!("ignoring report for unrequested address {}", address),
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dests(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    const LINUX_OUTPUT: &str = "\
ping 8.8.8.8 -c 3
PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=9.81 ms
64 bytes from 8.8.8.8: icmp_seq=2 ttl=117 time=9.64 ms
64 bytes from 8.8.8.8: icmp_seq=3 ttl=117 time=9.70 ms

--- 8.8.8.8 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 9.640/9.716/9.810/0.070 ms
ping 10.0.0.9 -c 3
PING 10.0.0.9 (10.0.0.9) 56(84) bytes of data.
From 10.0.0.1 icmp_seq=1 Destination Host Unreachable

--- 10.0.0.9 ping statistics ---
3 packets transmitted, 0 received, +3 errors, 100% packet loss, time 2036ms
";

    const IOS_OUTPUT: &str = "\
R1#ping 1.1.1.1 timeout 1 r 3
Type escape sequence to abort.
Sending 3, 100-byte ICMP Echos to 1.1.1.1, timeout is 1 seconds:
...
Success rate is 0 percent (0/3)
R1#ping 2.2.2.2 timeout 1 r 3
Type escape sequence to abort.
Sending 3, 100-byte ICMP Echos to 2.2.2.2, timeout is 1 seconds:
!!!
Success rate is 100 percent (3/3), round-trip min/avg/max = 1/1/2 ms
R1#
";

    #[test]
    fn test_packet_loss_linux() {
        let map = packet_loss(LINUX_OUTPUT, &dests(&["8.8.8.8", "10.0.0.9"]));
        assert_eq!(map.len(), 2);
        assert_eq!(map["8.8.8.8"], true);
        assert_eq!(map["10.0.0.9"], false);
    }

    #[test]
    fn test_packet_loss_partial_loss_is_unreachable() {
        let raw = "PING 192.0.2.1 (192.0.2.1)\n3 packets transmitted, 2 received, 33% packet loss, time 2002ms\n";
        let map = packet_loss(raw, &dests(&["192.0.2.1"]));
        assert_eq!(map["192.0.2.1"], false);
    }

    #[test]
    fn test_packet_loss_accepts_decimal_figures() {
        let raw = "PING 192.0.2.7 (192.0.2.7): 56 data bytes\n3 packets transmitted, 3 packets received, 0.0% packet loss\n";
        let map = packet_loss(raw, &dests(&["192.0.2.7"]));
        assert_eq!(map["192.0.2.7"], true);
    }

    #[test]
    fn test_packet_loss_block_without_figure_is_skipped() {
        // Interrupted ping: no statistics line
        let raw = "PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.\n64 bytes from 8.8.8.8\n";
        let map = packet_loss(raw, &dests(&["8.8.8.8"]));
        assert_eq!(map["8.8.8.8"], false);
    }

    #[test]
    fn test_missing_destination_defaults_to_unreachable() {
        let map = packet_loss(LINUX_OUTPUT, &dests(&["8.8.8.8", "203.0.113.5"]));
        assert_eq!(map["8.8.8.8"], true);
        assert_eq!(map["203.0.113.5"], false);
    }

    #[test]
    fn test_keys_are_exactly_the_destinations() {
        // 10.0.0.9 appears in the output but was not requested
        let map = packet_loss(LINUX_OUTPUT, &dests(&["8.8.8.8"]));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["8.8.8.8"]);

        let map = packet_loss("", &dests(&["1.1.1.1", "9.9.9.9"]));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["1.1.1.1", "9.9.9.9"]);
        assert!(map.values().all(|reachable| !reachable));
    }

    #[test]
    fn test_packet_loss_reads_eos_output() {
        let raw = "\
switch>en
switch#ping 10.1.1.1 repeat 3
PING 10.1.1.1 (10.1.1.1) 72(100) bytes of data.
80 bytes from 10.1.1.1: icmp_seq=1 ttl=64 time=0.112 ms

--- 10.1.1.1 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2ms
switch#
";
        let map = packet_loss(raw, &dests(&["10.1.1.1"]));
        assert_eq!(map["10.1.1.1"], true);
    }

    #[test]
    fn test_ipv4_rejects_out_of_range_octets() {
        assert!(IPV4.find("1.1.1.256").is_none());
        assert_eq!(IPV4.find("to 10.0.0.255:").unwrap().as_str(), "10.0.0.255");
    }

    #[test]
    fn test_success_rate_polarity() {
        let map = success_rate(IOS_OUTPUT, &dests(&["1.1.1.1", "2.2.2.2"]));
        assert_eq!(map["1.1.1.1"], false);
        assert_eq!(map["2.2.2.2"], true);
    }

    #[test]
    fn test_success_rate_partial_success_is_reachable() {
        let raw = "Sending 3, 100-byte ICMP Echos to 192.0.2.1, timeout is 1 seconds:\n.!!\nSuccess rate is 66 percent (2/3)\n";
        let map = success_rate(raw, &dests(&["192.0.2.1"]));
        assert_eq!(map["192.0.2.1"], true);
    }

    #[test]
    fn test_success_rate_zero_percent() {
        let raw = "...1.1.1.1, timeout is 1 seconds:\n...\nSuccess rate is 0 percent (0/3)";
        let map = success_rate(raw, &dests(&["1.1.1.1"]));
        assert_eq!(map, ReachabilityMap::from([("1.1.1.1".to_string(), false)]));
    }

    #[test]
    fn test_success_rate_needs_address_with_comma() {
        // The command echo carries the address but no comma
        let raw = "R1#ping 1.1.1.1 timeout 1 r 3\nSuccess rate is 100 percent (3/3)\n";
        let map = success_rate(raw, &dests(&["1.1.1.1"]));
        assert_eq!(map["1.1.1.1"], false);
    }

    #[test]
    fn test_success_rate_ignores_loss_vocabulary() {
        let map = success_rate(LINUX_OUTPUT, &dests(&["8.8.8.8"]));
        assert_eq!(map["8.8.8.8"], false);
    }
}
