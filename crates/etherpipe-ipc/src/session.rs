//! Socket driver for [`Client`].
//!
//! [`spawn`] starts a single tokio task that owns the client and the local
//! socket. Every state transition happens on that task: commands arrive over
//! a channel from any number of [`ClientHandle`]s, socket reads are fed to
//! the client, and the frames it produced are flushed before the next input
//! is taken. Completions go out on the event channel; a [`ClientStatus`]
//! snapshot is republished after every step.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use interprocess::local_socket::{
    tokio::{prelude::*, RecvHalf, SendHalf, Stream},
    GenericFilePath,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use etherpipe_core::config::ClientConfig;

use crate::client::{Client, ClientStatus};
use crate::error::ClientError;
use crate::events::ClientEvent;
use crate::transport::Outbox;
use crate::types::{ConnectionQuality, ConnectionState};

/// Requests from a [`ClientHandle`] to the session task.
#[derive(Debug, Clone)]
pub enum Command {
    Connect(String),
    GetAccounts,
    NewAccount {
        password: String,
        index: usize,
    },
    DeleteAccount {
        hash: String,
        password: String,
        index: usize,
    },
    UnlockAccount {
        hash: String,
        password: String,
        duration_secs: u64,
        index: usize,
    },
    SendTransaction {
        from: String,
        to: String,
        value: f64,
    },
    GetBlockNumber,
    GetPeerCount,
    GetGasPrice,
    Close,
}

/// Cloneable front end of a running session.
///
/// Calls return as soon as the command is queued on the session task;
/// results and failures arrive on the event channel returned by [`spawn`].
#[derive(Debug, Clone)]
pub struct ClientHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ClientStatus>,
}

impl ClientHandle {
    fn send(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::Lifecycle("session closed".to_string()))
    }

    pub fn connect(&self, path: impl Into<String>) -> Result<(), ClientError> {
        self.send(Command::Connect(path.into()))
    }

    pub fn get_accounts(&self) -> Result<(), ClientError> {
        self.send(Command::GetAccounts)
    }

    pub fn new_account(&self, password: impl Into<String>, index: usize) -> Result<(), ClientError> {
        self.send(Command::NewAccount {
            password: password.into(),
            index,
        })
    }

    pub fn delete_account(
        &self,
        hash: impl Into<String>,
        password: impl Into<String>,
        index: usize,
    ) -> Result<(), ClientError> {
        self.send(Command::DeleteAccount {
            hash: hash.into(),
            password: password.into(),
            index,
        })
    }

    pub fn unlock_account(
        &self,
        hash: impl Into<String>,
        password: impl Into<String>,
        duration_secs: u64,
        index: usize,
    ) -> Result<(), ClientError> {
        self.send(Command::UnlockAccount {
            hash: hash.into(),
            password: password.into(),
            duration_secs,
            index,
        })
    }

    pub fn send_transaction(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
        value: f64,
    ) -> Result<(), ClientError> {
        self.send(Command::SendTransaction {
            from: from.into(),
            to: to.into(),
            value,
        })
    }

    pub fn get_block_number(&self) -> Result<(), ClientError> {
        self.send(Command::GetBlockNumber)
    }

    pub fn get_peer_count(&self) -> Result<(), ClientError> {
        self.send(Command::GetPeerCount)
    }

    pub fn get_gas_price(&self) -> Result<(), ClientError> {
        self.send(Command::GetGasPrice)
    }

    /// Abort the connection and stop the session task.
    pub fn close_app(&self) -> Result<(), ClientError> {
        self.send(Command::Close)
    }

    /// Latest published status.
    pub fn status(&self) -> ClientStatus {
        self.status.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.status.borrow().busy
    }

    pub fn last_error(&self) -> Option<String> {
        self.status.borrow().last_error.clone()
    }

    pub fn last_error_code(&self) -> i64 {
        self.status.borrow().last_error_code
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.status.borrow().connection_state
    }

    pub fn quality(&self) -> ConnectionQuality {
        self.status.borrow().quality
    }

    pub fn peer_count(&self) -> u64 {
        self.status.borrow().peer_count
    }

    /// Wait until the session publishes a new status.
    pub async fn status_changed(&mut self) -> Result<ClientStatus, ClientError> {
        self.status
            .changed()
            .await
            .map_err(|_| ClientError::Lifecycle("session closed".to_string()))?;
        Ok(self.status.borrow_and_update().clone())
    }
}

/// Start a session task. Must be called from within a tokio runtime.
pub fn spawn(
    config: ClientConfig,
) -> (
    ClientHandle,
    mpsc::UnboundedReceiver<ClientEvent>,
    JoinHandle<()>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let client = Client::new(Outbox::new(), &config, event_tx);
    let (status_tx, status_rx) = watch::channel(client.status());

    let session = IpcSession {
        client,
        commands: command_rx,
        status: status_tx,
        config,
    };
    let task = tokio::spawn(session.run());

    let handle = ClientHandle {
        commands: command_tx,
        status: status_rx,
    };
    (handle, event_rx, task)
}

enum OpenError {
    TimedOut,
    Io(io::Error),
}

struct IpcSession {
    client: Client<Outbox>,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ClientStatus>,
    config: ClientConfig,
}

impl IpcSession {
    async fn run(mut self) {
        let mut reader: Option<RecvHalf> = None;
        let mut writer: Option<SendHalf> = None;
        let mut buf = vec![0u8; self.config.read_chunk_size];

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(Command::Close) => {
                        self.client.close();
                        self.publish();
                        break;
                    }
                    Some(Command::Connect(path)) => {
                        if let Some((r, w)) = self.connect(&path).await {
                            reader = Some(r);
                            writer = Some(w);
                        }
                    }
                    Some(command) => self.apply(command),
                },
                read = read_chunk(&mut reader, &mut buf) => match read {
                    Ok(n) => self.client.on_readable(&buf[..n]),
                    Err(e) => self
                        .client
                        .on_transport_error(ClientError::transport("error on socket read", &e)),
                },
            }

            if let Some(w) = writer.as_mut() {
                flush(&mut self.client, w).await;
            }
            if self.client.connection_state().is_unconnected() {
                reader = None;
                writer = None;
            }
            self.publish();
        }

        info!("IPC session stopped");
    }

    async fn connect(&mut self, path: &str) -> Option<(RecvHalf, SendHalf)> {
        self.client.connect(path).ok()?;
        self.publish();

        match open(path, self.config.connect_timeout()).await {
            Ok(stream) => {
                let (r, w) = stream.split();
                self.client.on_connected();
                Some((r, w))
            }
            Err(OpenError::TimedOut) => {
                self.client.on_connect_timeout();
                None
            }
            Err(OpenError::Io(e)) => {
                self.client.on_transport_error(ClientError::transport(
                    &format!("failed to connect to {path}"),
                    &e,
                ));
                None
            }
        }
    }

    fn apply(&mut self, command: Command) {
        let result = match command {
            Command::GetAccounts => self.client.get_accounts(),
            Command::NewAccount { password, index } => self.client.new_account(&password, index),
            Command::DeleteAccount {
                hash,
                password,
                index,
            } => self.client.delete_account(&hash, &password, index),
            Command::UnlockAccount {
                hash,
                password,
                duration_secs,
                index,
            } => self
                .client
                .unlock_account(&hash, &password, duration_secs, index),
            Command::SendTransaction { from, to, value } => {
                self.client.send_transaction(&from, &to, value)
            }
            Command::GetBlockNumber => self.client.get_block_number(),
            Command::GetPeerCount => self.client.get_peer_count(),
            Command::GetGasPrice => self.client.get_gas_price(),
            Command::Connect(_) | Command::Close => Ok(()),
        };
        if let Err(e) = result {
            debug!(error = %e, "command rejected");
        }
    }

    fn publish(&self) {
        self.status.send_replace(self.client.status());
    }
}

async fn open(path: &str, timeout: Duration) -> Result<Stream, OpenError> {
    let name = PathBuf::from(path)
        .to_fs_name::<GenericFilePath>()
        .map_err(OpenError::Io)?;

    match tokio::time::timeout(timeout, Stream::connect(name)).await {
        Ok(stream) => stream.map_err(OpenError::Io),
        Err(_) => Err(OpenError::TimedOut),
    }
}

/// Read from the socket, or wait forever when there is none.
async fn read_chunk(reader: &mut Option<RecvHalf>, buf: &mut [u8]) -> io::Result<usize> {
    match reader {
        Some(r) => r.read(buf).await,
        None => std::future::pending().await,
    }
}

/// Write every frame the client produced since the last flush.
async fn flush(client: &mut Client<Outbox>, writer: &mut SendHalf) {
    for frame in client.transport_mut().drain() {
        if let Err(e) = writer.write_all(&frame).await {
            warn!(error = %e, "socket write failed");
            client.on_transport_error(ClientError::transport("error on socket write", &e));
            return;
        }
    }
    if let Err(e) = writer.flush().await {
        client.on_transport_error(ClientError::transport("error on socket write", &e));
    }
}
