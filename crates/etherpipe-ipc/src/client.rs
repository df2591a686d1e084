//! Connection state machine and request lifecycle.
//!
//! [`Client`] owns the request queue, the connection state and the decoded
//! account list. It is driven by four inputs (a connect request, transport
//! connected, bytes readable, transport failed) and never performs I/O
//! itself: request frames go to a [`Transport`], notifications go out as
//! [`ClientEvent`]s.
//!
//! Only one call is ever in flight. A call is written when it becomes active
//! and the next one waits until the active call's reply has been dispatched
//! or [`Client::fail`] has reset the queue.

use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use etherpipe_core::config::{ClientConfig, PeerTiers};
use etherpipe_core::{AccountInfo, Quantity};

use crate::dispatch::{decode, extract_result, FrameBuffer, Reply};
use crate::envelope::CallEnvelope;
use crate::error::ClientError;
use crate::events::ClientEvent;
use crate::queue::RequestQueue;
use crate::transport::Transport;
use crate::types::{CallType, ConnectionQuality, ConnectionState};

/// Point-in-time view of the client, safe to hand to other tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientStatus {
    pub busy: bool,
    pub last_error: Option<String>,
    pub last_error_code: i64,
    pub connection_state: ConnectionState,
    pub quality: ConnectionQuality,
    pub peer_count: u64,
}

/// Single-connection JSON-RPC client state machine.
pub struct Client<T: Transport> {
    transport: T,
    queue: RequestQueue,
    frames: FrameBuffer,
    state: ConnectionState,
    path: Option<String>,
    last_error: Option<String>,
    last_error_code: i64,
    peer_count: u64,
    peer_tiers: PeerTiers,
    accounts: Vec<AccountInfo>,
    pending_filter: Option<Quantity>,
    busy_reported: bool,
    events: UnboundedSender<ClientEvent>,
}

impl<T: Transport> Client<T> {
    /// Create an unconnected client writing to `transport`.
    pub fn new(transport: T, config: &ClientConfig, events: UnboundedSender<ClientEvent>) -> Self {
        Self {
            transport,
            queue: RequestQueue::new(),
            frames: FrameBuffer::new(config.max_response_bytes),
            state: ConnectionState::Unconnected,
            path: None,
            last_error: None,
            last_error_code: 0,
            peer_count: 0,
            peer_tiers: config.peer_tiers,
            accounts: Vec::new(),
            pending_filter: None,
            busy_reported: false,
            events,
        }
    }

    // ---- Queries ----

    /// A call or a connect attempt is outstanding.
    pub fn is_busy(&self) -> bool {
        self.queue.is_busy()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_error_code(&self) -> i64 {
        self.last_error_code
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    /// Connection quality derived from state and the last peer count.
    pub fn quality(&self) -> ConnectionQuality {
        ConnectionQuality::classify(self.state, self.peer_count, &self.peer_tiers)
    }

    pub fn peer_count(&self) -> u64 {
        self.peer_count
    }

    /// Endpoint of the current or last connect attempt.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn accounts(&self) -> &[AccountInfo] {
        &self.accounts
    }

    /// Id of the filter installed on connect, once the daemon has answered.
    pub fn pending_transaction_filter(&self) -> Option<&Quantity> {
        self.pending_filter.as_ref()
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn status(&self) -> ClientStatus {
        ClientStatus {
            busy: self.is_busy(),
            last_error: self.last_error.clone(),
            last_error_code: self.last_error_code,
            connection_state: self.state,
            quality: self.quality(),
            peer_count: self.peer_count,
        }
    }

    // ---- Connection lifecycle ----

    /// Begin connecting to `path`. The owner opens the transport and reports
    /// back through [`on_connected`](Self::on_connected),
    /// [`on_connect_timeout`](Self::on_connect_timeout) or
    /// [`on_transport_error`](Self::on_transport_error).
    pub fn connect(&mut self, path: &str) -> Result<(), ClientError> {
        if !self.state.is_unconnected() {
            let err = ClientError::Lifecycle("already connected".to_string());
            self.fail(err.clone());
            return Err(err);
        }

        info!(path, "connecting to daemon");
        self.path = Some(path.to_string());
        self.state = ConnectionState::Connecting;
        self.peer_count = 0;
        self.pending_filter = None;
        self.frames.clear();
        self.transport.reset();
        self.queue.begin_handshake();
        self.sync_busy();
        Ok(())
    }

    /// The transport is up.
    pub fn on_connected(&mut self) {
        if self.state != ConnectionState::Connecting {
            warn!(state = ?self.state, "ignoring connected signal outside a connect attempt");
            return;
        }

        info!(path = self.path.as_deref().unwrap_or_default(), "connected to daemon");
        self.state = ConnectionState::Connected;
        // queued behind the handshake slot, so busy stays set across the switch
        if let Err(e) = self.new_pending_transaction_filter() {
            debug!(error = %e, "pending transaction filter not queued");
        }
        self.advance();

        self.emit(ClientEvent::Connected);
        self.emit(ClientEvent::ConnectionStateChanged(self.quality()));
    }

    /// The connect timer expired. Only a still-pending attempt is failed;
    /// a timer that fires after the transport came up is ignored.
    pub fn on_connect_timeout(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!(state = ?self.state, "connect timer expired after attempt finished");
            return;
        }

        let path = self.path.clone().unwrap_or_default();
        self.state = ConnectionState::Faulted;
        self.fail(ClientError::Transport {
            message: format!("connection to {path} timed out"),
            code: 0,
        });
    }

    /// The transport failed or was closed by the daemon.
    pub fn on_transport_error(&mut self, error: ClientError) {
        if self.state.is_unconnected() {
            debug!(error = %error, "transport error while unconnected");
            return;
        }

        self.state = ConnectionState::Faulted;
        self.frames.clear();
        self.transport.reset();
        self.fail(error);
    }

    /// Bytes arrived from the daemon. An empty read means the peer closed
    /// the connection.
    pub fn on_readable(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            self.on_transport_error(ClientError::Transport {
                message: "error on socket read: connection closed by daemon".to_string(),
                code: 0,
            });
            return;
        }

        debug!(len = bytes.len(), "received bytes");
        if let Err(e) = self.frames.extend(bytes) {
            self.frames.clear();
            self.fail(e);
            return;
        }

        loop {
            match self.frames.next_document() {
                Ok(Some(document)) => self.dispatch(document),
                Ok(None) => break,
                Err(e) => {
                    self.fail(e);
                    break;
                }
            }
        }
    }

    /// Shut the connection down at the owner's request. Outstanding calls
    /// are abandoned through [`fail`](Self::fail).
    pub fn close(&mut self) {
        info!("closing daemon connection");
        let was_connected = !self.state.is_unconnected();
        self.state = ConnectionState::Unconnected;
        self.frames.clear();
        self.transport.reset();

        if self.queue.is_busy() || self.queue.pending_len() > 0 {
            self.fail(ClientError::Transport {
                message: "connection closed".to_string(),
                code: 0,
            });
        } else if was_connected {
            self.emit(ClientEvent::ConnectionStateChanged(self.quality()));
        }
    }

    // ---- Queue ----

    /// Queue a call. It is written immediately when nothing else is in
    /// flight. A write failure goes through [`fail`](Self::fail) and is
    /// also returned to the caller.
    pub fn enqueue_call(&mut self, envelope: CallEnvelope) -> Result<(), ClientError> {
        let call_id = envelope.call_id();
        let method = envelope.method();
        if self.queue.push(envelope) {
            self.sync_busy();
            if let Err(e) = self.write_active() {
                self.fail(e.clone());
                return Err(e);
            }
            Ok(())
        } else {
            debug!(call_id, method, pending = self.queue.pending_len(), "call queued");
            Ok(())
        }
    }

    /// Build and queue a call.
    pub(crate) fn call(
        &mut self,
        call_type: CallType,
        params: Vec<Value>,
        index: Option<usize>,
    ) -> Result<(), ClientError> {
        let envelope = self.queue.envelope(call_type, params, index);
        self.enqueue_call(envelope)
    }

    /// Finish the active call and write the next pending one, if any.
    pub fn advance(&mut self) {
        let has_next = self.queue.advance();
        self.sync_busy();
        if has_next {
            if let Err(e) = self.write_active() {
                self.fail(e);
            }
        }
    }

    /// Record `error`, drop every queued call and notify the owner. The
    /// connection itself is left as it is.
    pub fn fail(&mut self, error: ClientError) {
        warn!(error = %error, code = error.code(), "IPC call failed");
        let dropped = self.queue.clear();
        if dropped > 0 {
            debug!(dropped, "abandoned queued calls");
        }

        self.last_error = Some(error.to_string());
        self.last_error_code = error.code();
        self.emit(ClientEvent::Error {
            message: error.to_string(),
            code: error.code(),
        });
        self.emit(ClientEvent::ConnectionStateChanged(self.quality()));
        self.advance();
    }

    fn write_active(&mut self) -> Result<(), ClientError> {
        let Some(envelope) = self.queue.active_call() else {
            return Ok(());
        };
        if !self.state.is_connected() {
            return Err(ClientError::Transport {
                message: "socket not writeable".to_string(),
                code: 0,
            });
        }

        let wire = envelope
            .to_wire()
            .map_err(|e| ClientError::Protocol(format!("request encode error: {e}")))?;
        match self.transport.write_frame(&wire) {
            Ok(0) => Err(ClientError::Transport {
                message: "error on socket write: nothing written".to_string(),
                code: 0,
            }),
            Ok(_) => {
                debug!(
                    call_id = envelope.call_id(),
                    method = envelope.method(),
                    "request written"
                );
                Ok(())
            }
            Err(e) => Err(ClientError::transport("error on socket write", &e)),
        }
    }

    // ---- Dispatch ----

    fn dispatch(&mut self, document: Value) {
        let Some(envelope) = self.queue.active_call().cloned() else {
            warn!("discarding response with no call in flight");
            return;
        };

        let outcome = extract_result(document, envelope.call_id())
            .and_then(|result| decode(envelope.call_type(), &result))
            .and_then(|reply| self.apply(&envelope, reply));

        match outcome {
            Ok(()) => {
                self.last_error = None;
                self.last_error_code = 0;
                self.advance();
            }
            Err(e) => self.fail(e),
        }
    }

    fn apply(&mut self, envelope: &CallEnvelope, reply: Reply) -> Result<(), ClientError> {
        let index = envelope.index();
        match reply {
            Reply::Accounts(addresses) => {
                self.accounts = addresses.iter().map(AccountInfo::new).collect();
                if self.accounts.is_empty() {
                    self.emit(ClientEvent::AccountsReady(Vec::new()));
                }
                // the list call is still active, so these only wait in the queue
                for (i, address) in addresses.into_iter().enumerate() {
                    let params = vec![json!(address), json!("latest")];
                    let balance = self
                        .queue
                        .envelope(CallType::GetBalance, params.clone(), Some(i));
                    self.queue.push(balance);
                    let count = self
                        .queue
                        .envelope(CallType::GetTransactionCount, params, Some(i));
                    self.queue.push(count);
                }
            }
            Reply::Balance(balance) => self.account_mut(index)?.set_balance(balance),
            Reply::TransactionCount(count) => {
                self.account_mut(index)?.set_transaction_count(count);
                if index.map(|i| i + 1) == Some(self.accounts.len()) {
                    self.emit(ClientEvent::AccountsReady(self.accounts.clone()));
                }
            }
            Reply::NewAccount(address) => {
                self.emit(ClientEvent::NewAccountDone { address, index });
            }
            Reply::DeleteAccount(result) => {
                self.emit(ClientEvent::DeleteAccountDone { result, index });
            }
            Reply::TransactionHash(hash) => {
                self.emit(ClientEvent::SendTransactionDone { hash });
            }
            Reply::Unlocked(result) => {
                self.emit(ClientEvent::UnlockAccountDone { result, index });
            }
            Reply::BlockNumber(number) => self.emit(ClientEvent::BlockNumberDone(number)),
            Reply::PeerCount(count) => {
                let before = self.quality();
                self.peer_count = count;
                self.emit(ClientEvent::PeerCountChanged(count));
                if self.quality() != before {
                    self.emit(ClientEvent::ConnectionStateChanged(self.quality()));
                }
            }
            Reply::GasPrice(price) => self.emit(ClientEvent::GasPriceDone(price)),
            Reply::PendingFilter(id) => {
                debug!(filter = %id.to_hex_string(), "pending transaction filter installed");
                self.pending_filter = Some(id);
            }
        }
        Ok(())
    }

    fn account_mut(&mut self, index: Option<usize>) -> Result<&mut AccountInfo, ClientError> {
        let len = self.accounts.len();
        index
            .and_then(|i| self.accounts.get_mut(i))
            .ok_or_else(|| {
                ClientError::Protocol(format!(
                    "account index {index:?} out of range for {len} accounts"
                ))
            })
    }

    // ---- Notifications ----

    fn sync_busy(&mut self) {
        let busy = self.queue.is_busy();
        if busy != self.busy_reported {
            self.busy_reported = busy;
            self.emit(ClientEvent::BusyChanged(busy));
        }
    }

    fn emit(&self, event: ClientEvent) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }
}
