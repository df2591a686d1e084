//! Error taxonomy for the IPC client.
//!
//! Every variant ends up in `Client::fail`, which records the message and
//! code as the client's last error and reports it through
//! [`ClientEvent::Error`](crate::events::ClientEvent::Error).

use etherpipe_core::QuantityError;
use thiserror::Error;

/// Error type for IPC client operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Connect, write or read failure on the local socket.
    #[error("{message}")]
    Transport { message: String, code: i64 },
    /// The daemon's reply could not be matched or understood.
    #[error("{0}")]
    Protocol(String),
    /// The daemon answered with a JSON-RPC error object.
    #[error("{message}")]
    Rpc { message: String, code: i64 },
    /// A call was rejected before reaching the transport.
    #[error("{0}")]
    Validation(String),
    /// The operation is not allowed in the current connection state.
    #[error("{0}")]
    Lifecycle(String),
}

impl ClientError {
    /// Wrap an I/O failure, keeping the OS error code when there is one.
    pub fn transport(context: &str, err: &std::io::Error) -> Self {
        Self::Transport {
            message: format!("{context}: {err}"),
            code: err.raw_os_error().map(i64::from).unwrap_or(0),
        }
    }

    /// The code reported alongside the message; 0 when none applies.
    pub fn code(&self) -> i64 {
        match self {
            Self::Transport { code, .. } | Self::Rpc { code, .. } => *code,
            Self::Protocol(_) | Self::Validation(_) | Self::Lifecycle(_) => 0,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<QuantityError> for ClientError {
    fn from(err: QuantityError) -> Self {
        Self::Protocol(format!("invalid quantity in response: {err}"))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(format!("response parse error: {err}"))
    }
}
