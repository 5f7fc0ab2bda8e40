//! SSH transport implementation using russh.

use std::sync::Arc;

use log::{debug, trace};
use russh::client::{self, Handle, KeyboardInteractiveAuthResponse, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::config::{PtySize, SshConfig};
use crate::error::{ChannelError, Result, TransportError};

/// Keyboard-interactive challenge rounds answered before giving up.
const MAX_CHALLENGE_ROUNDS: usize = 3;

/// SSH transport wrapping russh client.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// `host:port`, for log lines.
    peer: String,

    /// PTY to request on new shells.
    pty: Option<PtySize>,
}

/// A session channel with a running shell.
pub struct ShellChannel {
    /// The channel itself.
    pub channel: Channel<Msg>,

    /// Messages that arrived while waiting for the shell request reply.
    pub pending: Vec<ChannelMsg>,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate.
    pub async fn connect(config: &SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            preferred: config.preferred.clone(),
            ..Default::default()
        });

        let handler = SshHandler {
            peer: config.socket_addr(),
        };

        debug!("connecting to {}", config.socket_addr());

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|e| match e {
            russh::Error::IO(source) => TransportError::ConnectionFailed {
                host: config.host.clone(),
                port: config.port,
                source,
            },
            other => TransportError::Ssh(other),
        })?;

        tokio::time::timeout(config.timeout, Self::authenticate(&mut session, config))
            .await
            .map_err(|_| TransportError::Timeout(config.timeout))??;

        debug!("authenticated to {} as '{}'", config.socket_addr(), config.username);

        Ok(Self {
            session,
            peer: config.socket_addr(),
            pty: config.pty,
        })
    }

    /// Open a session channel and start an interactive shell on it.
    ///
    /// Both the PTY (when configured) and the shell are requested with
    /// `want_reply`, so a refusal surfaces here rather than as a silent
    /// session.
    pub async fn open_shell(&self) -> Result<ShellChannel> {
        let mut channel = self
            .session
            .channel_open_session()
            .await
            .map_err(ChannelError::SessionOpenFailed)?;

        let mut pending = Vec::new();

        if let Some(pty) = self.pty {
            channel
                .request_pty(true, "xterm", pty.width, pty.height, 0, 0, &[])
                .await
                .map_err(TransportError::Ssh)?;

            if !await_reply(&mut channel, &mut pending).await? {
                return Err(ChannelError::PtyRequestFailed.into());
            }
        }

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        if !await_reply(&mut channel, &mut pending).await? {
            return Err(ChannelError::ShellRequestFailed.into());
        }

        debug!("shell started on {}", self.peer);
        Ok(ShellChannel { channel, pending })
    }

    /// Authenticate with the server.
    ///
    /// Tries the password first, then falls back to keyboard-interactive,
    /// which many network operating systems use for the same password.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let password = config.password.expose_secret();

        let success = session
            .authenticate_password(config.username.as_str(), password)
            .await
            .map_err(TransportError::Ssh)?
            .success();

        if success {
            return Ok(());
        }

        debug!(
            "password auth rejected by {}, trying keyboard-interactive",
            config.socket_addr()
        );

        let mut reply = session
            .authenticate_keyboard_interactive_start(config.username.as_str(), None::<String>)
            .await
            .map_err(TransportError::Ssh)?;

        let mut rounds = 0;
        loop {
            match reply {
                KeyboardInteractiveAuthResponse::Success => return Ok(()),
                KeyboardInteractiveAuthResponse::Failure { .. } => break,
                KeyboardInteractiveAuthResponse::InfoRequest { prompts, .. } => {
                    if rounds == MAX_CHALLENGE_ROUNDS {
                        break;
                    }
                    rounds += 1;

                    let texts: Vec<&str> = prompts.iter().map(|p| p.prompt.as_str()).collect();
                    trace!("keyboard-interactive challenge: {:?}", texts);

                    reply = session
                        .authenticate_keyboard_interactive_respond(challenge_answers(
                            &texts, password,
                        ))
                        .await
                        .map_err(TransportError::Ssh)?;
                }
            }
        }

        Err(TransportError::AuthenticationFailed {
            user: config.username.clone(),
        }
        .into())
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    /// `host:port` of the peer.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

/// Wait for the reply to a `want_reply` channel request.
///
/// Output that races ahead of the reply is kept in `pending`.
async fn await_reply(channel: &mut Channel<Msg>, pending: &mut Vec<ChannelMsg>) -> Result<bool> {
    loop {
        match channel.wait().await {
            Some(ChannelMsg::Success) => return Ok(true),
            Some(ChannelMsg::Failure) => return Ok(false),
            Some(ChannelMsg::Eof | ChannelMsg::Close) | None => {
                return Err(ChannelError::Closed.into());
            }
            Some(msg @ (ChannelMsg::Data { .. } | ChannelMsg::ExtendedData { .. })) => {
                pending.push(msg);
            }
            Some(other) => trace!("ignoring {:?} while awaiting reply", other),
        }
    }
}

/// Answers for one keyboard-interactive challenge.
///
/// Only a single prompt asking for a password is answered; any other shape
/// gets no answers, which the server will treat as a failed attempt.
pub fn challenge_answers(prompts: &[&str], password: &str) -> Vec<String> {
    match prompts {
        [prompt] if is_password_prompt(prompt) => vec![password.to_string()],
        _ => Vec::new(),
    }
}

/// Whether a challenge prompt asks for the password.
pub fn is_password_prompt(prompt: &str) -> bool {
    prompt.trim().to_lowercase().contains("password:")
}

/// SSH client handler for russh.
struct SshHandler {
    peer: String,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        // Fleet inventories pin devices by address; host keys are not checked.
        debug!(
            "accepting {} host key from {} without verification",
            server_public_key.algorithm().as_str(),
            self.peer
        );
        Ok(true)
    }
}
