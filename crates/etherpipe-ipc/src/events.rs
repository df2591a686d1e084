//! Completion and error notifications delivered to the client's owner.

use etherpipe_core::AccountInfo;

use crate::types::ConnectionQuality;

/// Something the owner of a [`Client`](crate::client::Client) should know.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The transport is up and the pending-transaction filter was requested.
    Connected,
    /// Connection state or quality may have changed.
    ConnectionStateChanged(ConnectionQuality),
    /// The client started or stopped waiting on the daemon.
    BusyChanged(bool),
    /// A call or the transport failed; every queued call was dropped.
    Error { message: String, code: i64 },
    /// All accounts have their balance and transaction count.
    AccountsReady(Vec<AccountInfo>),
    NewAccountDone {
        address: String,
        index: Option<usize>,
    },
    DeleteAccountDone {
        result: bool,
        index: Option<usize>,
    },
    SendTransactionDone {
        hash: String,
    },
    UnlockAccountDone {
        result: bool,
        index: Option<usize>,
    },
    BlockNumberDone(u64),
    PeerCountChanged(u64),
    /// Gas price in ether, rendered as a decimal string.
    GasPriceDone(String),
}

impl ClientEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
