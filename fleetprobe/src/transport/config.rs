//! SSH connection configuration.

use std::borrow::Cow;
use std::time::Duration;

use russh::keys::{Algorithm, HashAlg};
use russh::{Preferred, cipher, kex, mac};
use secrecy::{ExposeSecret, SecretString};

use crate::device::Device;

/// Key exchanges that modern defaults drop but older network OS images still
/// offer exclusively.
const LEGACY_KEX: &[kex::Name] = &[kex::DH_G14_SHA1, kex::DH_GEX_SHA1, kex::DH_G1_SHA1];

/// CBC-mode ciphers for the same population of devices.
const LEGACY_CIPHERS: &[cipher::Name] = &[
    cipher::AES_128_CBC,
    cipher::AES_192_CBC,
    cipher::AES_256_CBC,
];

const LEGACY_MACS: &[mac::Name] = &[mac::HMAC_SHA1, mac::HMAC_SHA1_ETM];

/// Terminal dimensions for an optional PTY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    /// Terminal width in columns.
    pub width: u32,

    /// Terminal height in rows.
    pub height: u32,
}

impl Default for PtySize {
    fn default() -> Self {
        Self {
            width: 511,
            height: 24,
        }
    }
}

/// SSH connection configuration.
#[derive(Debug)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password, used for both password and keyboard-interactive auth.
    pub password: SecretString,

    /// Connection and authentication timeout.
    pub timeout: Duration,

    /// PTY to request before the shell, if any.
    pub pty: Option<PtySize>,

    /// Algorithm preference lists offered during key exchange.
    pub preferred: Preferred,
}

impl SshConfig {
    /// Build a configuration for `host` with the legacy-friendly algorithm set.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password,
            timeout: Duration::from_secs(30),
            pty: None,
            preferred: legacy_preferred(),
        }
    }

    /// Build a configuration from a device descriptor.
    pub fn for_device(device: &Device) -> Self {
        Self::new(
            device.address.as_str(),
            device.port,
            device.username.as_str(),
            SecretString::from(device.password.expose_secret().to_owned()),
        )
    }

    /// Set the connection timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Request a PTY of the given size before starting the shell.
    pub fn with_pty(mut self, pty: Option<PtySize>) -> Self {
        self.pty = pty;
        self
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The widest algorithm set we can offer: russh's defaults followed by the
/// legacy algorithms old switch and router firmware still depends on.
///
/// Defaults come first so that modern peers still negotiate modern algorithms.
pub fn legacy_preferred() -> Preferred {
    let defaults = Preferred::default();

    Preferred {
        kex: Cow::Owned(extend_unique(&defaults.kex, LEGACY_KEX)),
        cipher: Cow::Owned(extend_unique(&defaults.cipher, LEGACY_CIPHERS)),
        mac: Cow::Owned(extend_unique(&defaults.mac, LEGACY_MACS)),
        key: Cow::Owned(extend_unique(&defaults.key, &legacy_host_keys())),
        ..defaults
    }
}

/// SHA-1 `ssh-rsa` host keys, plus `rsa-sha2-256` for peers that only
/// advertise the RSA family.
fn legacy_host_keys() -> [Algorithm; 2] {
    [
        Algorithm::Rsa { hash: None },
        Algorithm::Rsa {
            hash: Some(HashAlg::Sha256),
        },
    ]
}

fn extend_unique<T: Clone + PartialEq>(base: &[T], extra: &[T]) -> Vec<T> {
    let mut merged = base.to_vec();
    for item in extra {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;

    #[test]
    fn test_legacy_preferred_extends_defaults() {
        let defaults = Preferred::default();
        let preferred = legacy_preferred();

        // Defaults keep their position at the front
        assert_eq!(&preferred.kex[..defaults.kex.len()], &defaults.kex[..]);
        assert_eq!(
            &preferred.cipher[..defaults.cipher.len()],
            &defaults.cipher[..]
        );

        for legacy in LEGACY_KEX {
            assert!(preferred.kex.contains(legacy));
        }
        for legacy in LEGACY_CIPHERS {
            assert!(preferred.cipher.contains(legacy));
        }
        for legacy in LEGACY_MACS {
            assert!(preferred.mac.contains(legacy));
        }
        assert!(preferred.key.contains(&Algorithm::Rsa { hash: None }));
    }

    #[test]
    fn test_extend_unique_skips_duplicates() {
        assert_eq!(extend_unique(&[1, 2], &[2, 3, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn test_for_device() {
        let device = Device::new("sw1", DeviceKind::AristaEos, "10.1.1.1")
            .port(2200)
            .username("admin")
            .password("pw");

        let config = SshConfig::for_device(&device);
        assert_eq!(config.socket_addr(), "10.1.1.1:2200");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password.expose_secret(), "pw");
        assert!(config.pty.is_none());
    }
}
