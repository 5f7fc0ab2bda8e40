//! Channel layer: command execution and output capture.
//!
//! This module handles the interactive session itself: pacing commands
//! into the shell and collecting both output streams as ordered text.

mod buffer;
mod executor;

pub use buffer::{LineBuffer, SessionOutput};
pub use executor::SessionExecutor;
