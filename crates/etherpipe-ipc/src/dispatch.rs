//! Response dispatch: framing, call matching and per-type decoding.
//!
//! Inbound bytes are collected in a [`FrameBuffer`] until a complete JSON
//! document is available. Each document is checked against the active call
//! with [`extract_result`] and turned into a typed [`Reply`] by the decoder
//! registered for the call's [`CallType`].

use serde_json::Value;

use etherpipe_core::Quantity;

use crate::envelope::JsonRpcResponse;
use crate::error::ClientError;
use crate::types::CallType;

/// Reassembles JSON documents from a byte stream.
///
/// A document may arrive split over several reads; whitespace between
/// documents (the daemon's newline terminator) is skipped.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    limit: usize,
}

impl FrameBuffer {
    /// A buffer that refuses to hold more than `limit` unparsed bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
        }
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        if self.buf.len() + bytes.len() > self.limit {
            return Err(ClientError::Protocol(format!(
                "response exceeds {} bytes",
                self.limit
            )));
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Pop the next complete document, or `None` if more bytes are needed.
    pub fn next_document(&mut self) -> Result<Option<Value>, ClientError> {
        let (next, consumed) = {
            let mut stream = serde_json::Deserializer::from_slice(&self.buf).into_iter::<Value>();
            let next = stream.next();
            (next, stream.byte_offset())
        };

        match next {
            Some(Ok(document)) => {
                self.buf.drain(..consumed);
                Ok(Some(document))
            }
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(e)) => {
                self.buf.clear();
                Err(e.into())
            }
            None => {
                // only whitespace left
                self.buf.clear();
                Ok(None)
            }
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Match a response document against the active call and pull out its
/// result, or the daemon's error.
pub fn extract_result(document: Value, expected_id: u64) -> Result<Value, ClientError> {
    if !document.is_object() {
        return Err(ClientError::Protocol(format!(
            "response parse error: expected a JSON-RPC object, got {document}"
        )));
    }
    let response: JsonRpcResponse = serde_json::from_value(document)?;

    if response.id.as_u64() != Some(expected_id) {
        return Err(ClientError::Protocol(format!(
            "call number mismatch: expected {expected_id}, got {}",
            response.id
        )));
    }

    if let Some(result) = response.result {
        return Ok(result);
    }

    if let Some(error) = response.error {
        return Err(ClientError::Rpc {
            message: error
                .message
                .unwrap_or_else(|| "daemon returned an error without a message".to_string()),
            code: error.code,
        });
    }

    Err(ClientError::Protocol(
        "result object undefined in IPC response".to_string(),
    ))
}

/// A decoded result, tagged by the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Accounts(Vec<String>),
    /// Balance in ether.
    Balance(String),
    TransactionCount(u64),
    NewAccount(String),
    DeleteAccount(bool),
    TransactionHash(String),
    Unlocked(bool),
    BlockNumber(u64),
    PeerCount(u64),
    /// Gas price in ether.
    GasPrice(String),
    PendingFilter(Quantity),
}

/// Turns a call's raw `result` into a [`Reply`].
pub type Decoder = fn(&Value) -> Result<Reply, ClientError>;

/// The decoder for each call type.
pub fn decoder(call_type: CallType) -> Decoder {
    match call_type {
        CallType::ListAccounts => decode_accounts,
        CallType::GetBalance => |v: &Value| Ok(Reply::Balance(hex_ether(v)?)),
        CallType::GetTransactionCount => |v: &Value| Ok(Reply::TransactionCount(hex_u64(v)?)),
        CallType::NewAccount => |v: &Value| Ok(Reply::NewAccount(string(v)?)),
        CallType::DeleteAccount => |v: &Value| Ok(Reply::DeleteAccount(boolean(v)?)),
        CallType::SendTransaction => |v: &Value| Ok(Reply::TransactionHash(string(v)?)),
        CallType::UnlockAccount => |v: &Value| Ok(Reply::Unlocked(boolean(v)?)),
        CallType::GetBlockNumber => |v: &Value| Ok(Reply::BlockNumber(hex_u64(v)?)),
        CallType::GetPeerCount => |v: &Value| Ok(Reply::PeerCount(hex_u64(v)?)),
        CallType::GetGasPrice => |v: &Value| Ok(Reply::GasPrice(hex_ether(v)?)),
        CallType::NewPendingTransactionFilter => |v: &Value| Ok(Reply::PendingFilter(hex(v)?)),
    }
}

/// Decode a result for the given call type.
pub fn decode(call_type: CallType, result: &Value) -> Result<Reply, ClientError> {
    decoder(call_type)(result)
}

fn decode_accounts(value: &Value) -> Result<Reply, ClientError> {
    let entries = value
        .as_array()
        .ok_or_else(|| unexpected("an array of addresses", value))?;
    entries
        .iter()
        .map(string)
        .collect::<Result<Vec<_>, _>>()
        .map(Reply::Accounts)
}

fn string(value: &Value) -> Result<String, ClientError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| unexpected("a string", value))
}

fn boolean(value: &Value) -> Result<bool, ClientError> {
    value.as_bool().ok_or_else(|| unexpected("a boolean", value))
}

fn hex(value: &Value) -> Result<Quantity, ClientError> {
    let s = value
        .as_str()
        .ok_or_else(|| unexpected("a hex quantity", value))?;
    Ok(Quantity::from_hex(s)?)
}

fn hex_u64(value: &Value) -> Result<u64, ClientError> {
    Ok(hex(value)?.to_u64()?)
}

fn hex_ether(value: &Value) -> Result<String, ClientError> {
    Ok(hex(value)?.to_ether_string())
}

fn unexpected(expected: &str, got: &Value) -> ClientError {
    ClientError::Protocol(format!("unexpected result: expected {expected}, got {got}"))
}
