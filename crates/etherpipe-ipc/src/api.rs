//! Daemon calls exposed to the client's owner.
//!
//! Every method queues one call and returns once it has been written or
//! queued. The outcome arrives later as a [`ClientEvent`](crate::ClientEvent).
//! A returned error has already been reported through
//! [`Client::fail`](crate::Client::fail).

use serde_json::{json, Value};

use etherpipe_core::Quantity;

use crate::client::Client;
use crate::error::ClientError;
use crate::transport::Transport;
use crate::types::CallType;

impl<T: Transport> Client<T> {
    /// List the daemon's accounts, then fetch balance and transaction count
    /// for each. Completes with `AccountsReady`.
    pub fn get_accounts(&mut self) -> Result<(), ClientError> {
        self.call(CallType::ListAccounts, vec![], None)
    }

    /// Create an account protected by `password`. `index` is echoed back in
    /// `NewAccountDone`.
    pub fn new_account(&mut self, password: &str, index: usize) -> Result<(), ClientError> {
        self.call(CallType::NewAccount, vec![json!(password)], Some(index))
    }

    pub fn delete_account(
        &mut self,
        hash: &str,
        password: &str,
        index: usize,
    ) -> Result<(), ClientError> {
        self.call(
            CallType::DeleteAccount,
            vec![json!(hash), json!(password)],
            Some(index),
        )
    }

    /// Unlock `hash` for `duration_secs` seconds.
    pub fn unlock_account(
        &mut self,
        hash: &str,
        password: &str,
        duration_secs: u64,
        index: usize,
    ) -> Result<(), ClientError> {
        let duration = Quantity::from(duration_secs).to_hex_string();
        self.call(
            CallType::UnlockAccount,
            vec![json!(hash), json!(password), json!(duration)],
            Some(index),
        )
    }

    /// Send `value` ether from `from` to `to`. The value must be a positive
    /// finite amount.
    pub fn send_transaction(&mut self, from: &str, to: &str, value: f64) -> Result<(), ClientError> {
        let wei = match validate_value(value) {
            Ok(wei) => wei,
            Err(e) => {
                self.fail(e.clone());
                return Err(e);
            }
        };

        let transaction: Value = json!({
            "from": from,
            "to": to,
            "value": wei.to_hex_string(),
        });
        self.call(CallType::SendTransaction, vec![transaction], None)
    }

    pub fn get_block_number(&mut self) -> Result<(), ClientError> {
        self.call(CallType::GetBlockNumber, vec![], None)
    }

    pub fn get_peer_count(&mut self) -> Result<(), ClientError> {
        self.call(CallType::GetPeerCount, vec![], None)
    }

    pub fn get_gas_price(&mut self) -> Result<(), ClientError> {
        self.call(CallType::GetGasPrice, vec![], None)
    }

    pub(crate) fn new_pending_transaction_filter(&mut self) -> Result<(), ClientError> {
        self.call(CallType::NewPendingTransactionFilter, vec![], None)
    }
}

fn validate_value(value: f64) -> Result<Quantity, ClientError> {
    if !(value > 0.0) {
        return Err(ClientError::Validation(
            "invalid transaction value".to_string(),
        ));
    }
    Quantity::from_ether(value)
        .map_err(|e| ClientError::Validation(format!("invalid transaction value: {e}")))
}
