//! Call envelopes and the JSON-RPC 2.0 wire types.
//!
//! Request format:
//! ```json
//! {"jsonrpc":"2.0","method":"eth_getBalance","id":4,"params":["0x...","latest"]}
//! ```
//!
//! Success response:
//! ```json
//! {"jsonrpc":"2.0","id":4,"result":"0xde0b6b3a7640000"}
//! ```
//!
//! Error response:
//! ```json
//! {"jsonrpc":"2.0","id":4,"error":{"code":-32000,"message":"unknown account"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::CallType;

/// One RPC call, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CallEnvelope {
    call_id: u64,
    call_type: CallType,
    params: Vec<Value>,
    index: Option<usize>,
}

impl CallEnvelope {
    /// Build an envelope. Call ids are handed out by the
    /// [`RequestQueue`](crate::queue::RequestQueue) that owns the counter.
    pub fn new(call_id: u64, call_type: CallType, params: Vec<Value>, index: Option<usize>) -> Self {
        Self {
            call_id,
            call_type,
            params,
            index,
        }
    }

    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    pub fn call_type(&self) -> CallType {
        self.call_type
    }

    pub fn method(&self) -> &'static str {
        self.call_type.method()
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Slot this call correlates to, e.g. a position in the account list.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// The JSON-RPC request object for this call.
    pub fn to_request(&self) -> JsonRpcRequest<'_> {
        JsonRpcRequest {
            jsonrpc: "2.0",
            method: self.method(),
            id: self.call_id,
            params: &self.params,
        }
    }

    /// Newline-terminated wire bytes.
    pub fn to_wire(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec(&self.to_request())?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// JSON-RPC 2.0 request object.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Method name to invoke.
    pub method: &'a str,
    /// Call id echoed back by the daemon.
    pub id: u64,
    /// Positional parameters.
    pub params: &'a [Value],
}

/// JSON-RPC 2.0 response object.
///
/// A `null` result deserializes to `None`, the same as an absent one.
#[derive(Debug, Default, Deserialize)]
pub struct JsonRpcResponse {
    /// Request ID (echoed from request).
    #[serde(default)]
    pub id: Value,
    /// Result on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Default, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    #[serde(default)]
    pub code: i64,
    /// Error message.
    #[serde(default)]
    pub message: Option<String>,
}
