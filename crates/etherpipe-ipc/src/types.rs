//! Call types and connection state shared across the IPC layer.

use std::fmt;

use etherpipe_core::config::PeerTiers;

/// Call discriminant: maps each call to its JSON-RPC method and decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallType {
    ListAccounts,
    GetBalance,
    GetTransactionCount,
    NewAccount,
    DeleteAccount,
    SendTransaction,
    UnlockAccount,
    GetBlockNumber,
    GetPeerCount,
    GetGasPrice,
    /// Installed once per connection without being requested by the caller.
    NewPendingTransactionFilter,
}

impl CallType {
    /// Get the JSON-RPC method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::ListAccounts => "personal_listAccounts",
            Self::GetBalance => "eth_getBalance",
            Self::GetTransactionCount => "eth_getTransactionCount",
            Self::NewAccount => "personal_newAccount",
            Self::DeleteAccount => "personal_deleteAccount",
            Self::SendTransaction => "eth_sendTransaction",
            Self::UnlockAccount => "personal_unlockAccount",
            Self::GetBlockNumber => "eth_blockNumber",
            Self::GetPeerCount => "net_peerCount",
            Self::GetGasPrice => "eth_gasPrice",
            Self::NewPendingTransactionFilter => "eth_newPendingTransactionFilter",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Lifecycle of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unconnected,
    Connecting,
    Connected,
    /// The transport was lost through an error; a new connect is allowed.
    Faulted,
}

impl ConnectionState {
    /// No transport exists, so `connect` may be called.
    pub fn is_unconnected(&self) -> bool {
        matches!(self, Self::Unconnected | Self::Faulted)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Externally visible connection quality, coarsened from the peer count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ConnectionQuality {
    #[default]
    Disconnected = 0,
    Poor = 1,
    Fair = 2,
    Good = 3,
}

impl ConnectionQuality {
    /// Classify a connection by its state and the last known peer count.
    pub fn classify(state: ConnectionState, peer_count: u64, tiers: &PeerTiers) -> Self {
        if !state.is_connected() {
            Self::Disconnected
        } else if peer_count >= tiers.good {
            Self::Good
        } else if peer_count >= tiers.fair {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// Numeric code: 0 when disconnected, 1..=3 by peer tier.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Poor => "Connected (poor peer count)",
            Self::Fair => "Connected (fair peer count)",
            Self::Good => "Connected (good peer count)",
        }
    }
}

impl fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
