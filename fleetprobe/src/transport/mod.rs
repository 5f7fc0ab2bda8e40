//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level SSH connection management:
//! algorithm negotiation for old network equipment, password and
//! keyboard-interactive authentication, and shell channel creation.

pub mod config;
mod ssh;

pub use config::{PtySize, SshConfig, legacy_preferred};
pub use ssh::{ShellChannel, SshTransport, challenge_answers, is_password_prompt};
