//! Shared session plumbing for one-shot subcommands.

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use etherpipe_core::config::ClientConfig;
use etherpipe_ipc::{spawn, ClientEvent, ClientHandle};

/// A connected session, ready for calls.
pub struct Session {
    pub handle: ClientHandle,
    events: UnboundedReceiver<ClientEvent>,
}

impl Session {
    /// Connect to the configured socket and wait until the connect-time
    /// filter call has settled.
    pub async fn open(config: ClientConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let path = config.socket_path.to_string_lossy().into_owned();
        let (handle, events, _task) = spawn(config);
        let mut session = Self { handle, events };

        session.handle.connect(path)?;
        session
            .wait(|event| matches!(event, ClientEvent::Connected).then_some(()))
            .await?;

        // a daemon without filter support is still usable
        loop {
            match session.next().await? {
                ClientEvent::BusyChanged(false) => break,
                ClientEvent::Error { message, code } => {
                    warn!(code, "pending transaction filter failed: {message}");
                }
                other => debug!(?other, "ignoring event"),
            }
        }
        Ok(session)
    }

    /// Wait for the first event `pick` accepts. An error event ends the wait.
    pub async fn wait<T>(
        &mut self,
        mut pick: impl FnMut(ClientEvent) -> Option<T>,
    ) -> Result<T, Box<dyn std::error::Error>> {
        loop {
            match self.next().await? {
                ClientEvent::Error { message, code } if code != 0 => {
                    return Err(format!("{message} (code {code})").into())
                }
                ClientEvent::Error { message, .. } => return Err(message.into()),
                event => {
                    if let Some(value) = pick(event) {
                        return Ok(value);
                    }
                }
            }
        }
    }

    /// Stop the session task.
    pub fn close(self) {
        if let Err(e) = self.handle.close_app() {
            debug!(error = %e, "session already closed");
        }
    }

    async fn next(&mut self) -> Result<ClientEvent, Box<dyn std::error::Error>> {
        self.events
            .recv()
            .await
            .ok_or_else(|| "session ended unexpectedly".into())
    }
}
