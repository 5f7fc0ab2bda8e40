//! Device descriptors.
//!
//! A [`Device`] is the static description of one node in the fleet: who it
//! is, which CLI dialect it speaks, how to log in, and which destinations it
//! should ping. Descriptors are read-only once built and are shared with
//! their probe through an `Arc`.
//!
//! Descriptors deserialize from the node-list field names used by fleet
//! inventory files:
//!
//! ```text
//! - name: core-1
//!   type: arista_eos
//!   ip: 10.0.0.1
//!   ssh_port: 22
//!   username: admin
//!   password: secret
//!   dest_ips: [8.8.8.8, 10.0.0.9]
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::error::{ConfigError, Result};

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// CLI dialect of a device.
///
/// The tag set is open: anything not recognised is kept as [`DeviceKind::Other`]
/// and probed like a generic POSIX host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "String")]
pub enum DeviceKind {
    /// Generic Linux/Unix host (`linux`).
    #[default]
    Linux,

    /// Arista EOS switch (`arista_eos`).
    AristaEos,

    /// Cisco IOS router (`cisco_ios`).
    CiscoIos,

    /// Unrecognised tag.
    Other(String),
}

impl DeviceKind {
    /// Map a configuration tag to a kind.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "linux" => DeviceKind::Linux,
            "arista_eos" => DeviceKind::AristaEos,
            "cisco_ios" => DeviceKind::CiscoIos,
            other => DeviceKind::Other(other.to_string()),
        }
    }

    /// The configuration tag for this kind.
    pub fn tag(&self) -> &str {
        match self {
            DeviceKind::Linux => "linux",
            DeviceKind::AristaEos => "arista_eos",
            DeviceKind::CiscoIos => "cisco_ios",
            DeviceKind::Other(tag) => tag,
        }
    }
}

impl From<String> for DeviceKind {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl FromStr for DeviceKind {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Static configuration of one device.
#[derive(Debug, Deserialize)]
pub struct Device {
    /// Human-readable identity.
    pub name: String,

    /// CLI dialect.
    #[serde(rename = "type", default)]
    pub kind: DeviceKind,

    /// Management address, also used as the device's source identity.
    #[serde(rename = "ip")]
    pub address: String,

    /// SSH port.
    #[serde(
        rename = "ssh_port",
        default = "default_port",
        deserialize_with = "deserialize_port"
    )]
    pub port: u16,

    /// Login user.
    pub username: String,

    /// Login password.
    #[serde(deserialize_with = "deserialize_secret")]
    pub password: SecretString,

    /// Destinations to ping, in report order.
    #[serde(rename = "dest_ips", default)]
    pub destinations: Vec<String>,
}

impl Device {
    /// Start describing a device. Port defaults to 22, credentials are empty.
    pub fn new(name: impl Into<String>, kind: DeviceKind, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            address: address.into(),
            port: DEFAULT_SSH_PORT,
            username: String::new(),
            password: SecretString::from(String::new()),
            destinations: Vec::new(),
        }
    }

    /// Set the SSH port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the login user.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the login password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = SecretString::from(password.into());
        self
    }

    /// Append a destination.
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destinations.push(destination.into());
        self
    }

    /// Append several destinations.
    pub fn destinations<I, S>(mut self, destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.destinations
            .extend(destinations.into_iter().map(Into::into));
        self
    }
}

/// Parse an SSH port written as text (inventory files often quote it).
pub fn parse_port(value: &str) -> Result<u16> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_SSH_PORT);
    }
    trimmed.parse::<u16>().map_err(|_| {
        ConfigError::InvalidPort {
            value: value.to_string(),
        }
        .into()
    })
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u16),
        Text(String),
    }

    match RawPort::deserialize(deserializer)? {
        RawPort::Number(port) => Ok(port),
        RawPort::Text(text) => parse_port(&text).map_err(serde::de::Error::custom),
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}
