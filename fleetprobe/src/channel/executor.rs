//! Remote command execution over an interactive shell.
//!
//! [`SessionExecutor`] runs a fixed list of commands on a device and returns
//! everything the device printed. One execution is four concurrent pieces:
//!
//! - a **pump** that owns the channel and routes stdout and stderr data into
//!   two byte queues (and sends EOF when the writer is done),
//! - two **drains** that turn those queues into lines on a shared
//!   [`SessionOutput`],
//! - the **writer**, which sends the commands in order with a fixed pause
//!   after each one.
//!
//! The pause is the only pacing there is: nothing detects that a command has
//! finished before the next one is written.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace, warn};
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use super::buffer::{LineBuffer, SessionOutput};
use crate::error::Result;
use crate::transport::{ShellChannel, SshConfig, SshTransport};

/// Extended data type code for stderr.
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// Runs paced command sequences on one device.
#[derive(Debug)]
pub struct SessionExecutor {
    /// Connection settings.
    config: SshConfig,

    /// Upper bound on one session, from shell start to termination.
    session_timeout: Option<Duration>,
}

impl SessionExecutor {
    /// Create an executor with no session deadline.
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            session_timeout: None,
        }
    }

    /// Bound the command exchange and the wait for the shell to exit.
    ///
    /// When the deadline passes, writing stops, the channel is abandoned and
    /// the output captured so far is returned.
    pub fn with_session_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Get the connection settings.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Connect, run `commands` with `delay` after each, and return the
    /// captured output of both streams.
    pub async fn execute(&self, commands: &[String], delay: Duration) -> Result<String> {
        let transport = SshTransport::connect(&self.config).await?;

        let result = self.exchange(&transport, commands, delay).await;

        if let Err(e) = transport.close().await {
            debug!("error while disconnecting from {}: {}", self.config.socket_addr(), e);
        }

        result
    }

    async fn exchange(
        &self,
        transport: &SshTransport,
        commands: &[String],
        delay: Duration,
    ) -> Result<String> {
        let ShellChannel { channel, pending } = transport.open_shell().await?;
        let deadline = self.session_timeout.map(|timeout| Instant::now() + timeout);
        let peer: Arc<str> = Arc::from(transport.peer());

        let output = Arc::new(Mutex::new(SessionOutput::new()));
        let mut writer = Box::pin(channel.make_writer());

        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();
        let (eof_tx, eof_rx) = oneshot::channel();

        let stdout_drain = tokio::spawn(drain(stdout_rx, output.clone(), "stdout", peer.clone()));
        let stderr_drain = tokio::spawn(drain(stderr_rx, output.clone(), "stderr", peer.clone()));
        let mut pump = tokio::spawn(pump(channel, pending, stdout_tx, stderr_tx, eof_rx));

        let sent = within(deadline, write_commands(&mut writer, commands, delay, &peer)).await;
        match sent {
            Some(sent) if sent < commands.len() => {
                warn!("{}: sent {} of {} commands", peer, sent, commands.len());
            }
            Some(_) => {}
            None => warn!("{}: session deadline reached while sending commands", peer),
        }

        // End of input; the shell exits once it has drained its stdin.
        let _ = eof_tx.send(());

        match within(deadline, &mut pump).await {
            Some(Ok(Some(status))) => debug!("{}: shell exited with status {}", peer, status),
            Some(Ok(None)) => debug!("{}: channel closed", peer),
            Some(Err(e)) => warn!("{}: channel pump failed: {}", peer, e),
            None => {
                warn!(
                    "{}: session deadline reached before the shell exited, keeping partial output",
                    peer
                );
                pump.abort();
            }
        }

        // The drains end once the pump has dropped its senders.
        for drain in [stdout_drain, stderr_drain] {
            if let Err(e) = drain.await {
                warn!("{}: output drain failed: {}", peer, e);
            }
        }

        let text = output.lock().unwrap_or_else(PoisonError::into_inner).take();
        debug!("{}: captured {} bytes", peer, text.len());
        Ok(text)
    }
}

/// Await `fut`, giving up at `deadline` if there is one.
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(at) => tokio::time::timeout_at(at, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// Write each command followed by a newline, pausing `delay` after each.
///
/// Returns how many commands were written. A write error stops the sequence;
/// output already produced by the device is still collected.
pub(crate) async fn write_commands<W>(
    writer: &mut W,
    commands: &[String],
    delay: Duration,
    peer: &str,
) -> usize
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut sent = 0;
    for command in commands {
        let line = format!("{command}\n");
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!("{}: error writing command {:?}: {}", peer, command, e);
            break;
        }
        if let Err(e) = writer.flush().await {
            warn!("{}: error flushing command {:?}: {}", peer, command, e);
            break;
        }
        debug!("{}: sent {:?}", peer, command);
        sent += 1;
        tokio::time::sleep(delay).await;
    }
    sent
}

/// Own the channel: route incoming data to the drains and send EOF when
/// told to. Returns the exit status if the shell reported one.
async fn pump(
    mut channel: Channel<Msg>,
    pending: Vec<ChannelMsg>,
    stdout: mpsc::UnboundedSender<Bytes>,
    stderr: mpsc::UnboundedSender<Bytes>,
    mut eof: oneshot::Receiver<()>,
) -> Option<u32> {
    let mut exit_status = None;
    let mut input_open = true;

    for msg in pending {
        route(msg, &stdout, &stderr, &mut exit_status);
    }

    loop {
        tokio::select! {
            signal = &mut eof, if input_open => {
                input_open = false;
                if signal.is_ok() {
                    if let Err(e) = channel.eof().await {
                        debug!("failed to send EOF: {}", e);
                    }
                }
            }
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Close) | None => break,
                Some(msg) => route(msg, &stdout, &stderr, &mut exit_status),
            }
        }
    }

    exit_status
}

fn route(
    msg: ChannelMsg,
    stdout: &mpsc::UnboundedSender<Bytes>,
    stderr: &mpsc::UnboundedSender<Bytes>,
    exit_status: &mut Option<u32>,
) {
    match msg {
        ChannelMsg::Data { data } => {
            let _ = stdout.send(Bytes::copy_from_slice(&data));
        }
        ChannelMsg::ExtendedData { data, ext } if ext == SSH_EXTENDED_DATA_STDERR => {
            let _ = stderr.send(Bytes::copy_from_slice(&data));
        }
        ChannelMsg::ExitStatus { exit_status: status } => *exit_status = Some(status),
        other => trace!("unhandled channel message: {:?}", other),
    }
}

/// Turn one stream's chunks into lines on the shared output.
pub(crate) async fn drain(
    mut chunks: mpsc::UnboundedReceiver<Bytes>,
    output: Arc<Mutex<SessionOutput>>,
    stream: &'static str,
    peer: Arc<str>,
) {
    let mut lines = LineBuffer::new();

    while let Some(chunk) = chunks.recv().await {
        let complete = lines.push(&chunk);
        if complete.is_empty() {
            continue;
        }
        let mut output = output.lock().unwrap_or_else(PoisonError::into_inner);
        for line in complete {
            trace!("{} {}: {}", peer, stream, line);
            output.push_line(&line);
        }
    }

    if let Some(rest) = lines.finish() {
        trace!("{} {}: {}", peer, stream, rest);
        output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_line(&rest);
    }
}
