//! Error types for fleetprobe.

use std::io;
use thiserror::Error;

/// Main error type for fleetprobe operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session channel errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Probe orchestration errors
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Device descriptor errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to dial the host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Neither password nor keyboard-interactive authentication succeeded
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Session channel errors (opening the channel and the remote shell).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open a session channel
    #[error("Failed to open session channel: {0}")]
    SessionOpenFailed(#[source] russh::Error),

    /// The server refused the PTY request
    #[error("Failed to request PTY")]
    PtyRequestFailed,

    /// The server refused or could not start the shell
    #[error("Failed to request shell")]
    ShellRequestFailed,

    /// Channel closed before the shell was granted
    #[error("Channel closed")]
    Closed,
}

/// Orchestration errors.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Two probes share a source address, so their results would collide
    #[error("Duplicate source address '{address}' (devices '{first}' and '{second}')")]
    DuplicateSource {
        address: String,
        first: String,
        second: String,
    },

    /// The probe task ended without reporting a result
    #[error("Probe task for '{address}' failed: {message}")]
    TaskFailed { address: String, message: String },
}

/// Device descriptor errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Port value could not be interpreted
    #[error("Invalid SSH port '{value}'")]
    InvalidPort { value: String },
}

/// Result type alias using fleetprobe's Error.
pub type Result<T> = std::result::Result<T, Error>;
