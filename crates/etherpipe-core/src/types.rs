//! Common types shared across etherpipe crates.

use serde::Serialize;

/// A daemon-managed account, filled in by follow-up balance and nonce calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    /// Account address as returned by the daemon.
    pub hash: String,
    /// Balance in ether, rendered as a decimal string.
    pub balance: Option<String>,
    /// Number of transactions sent from this account.
    pub transaction_count: Option<u64>,
}

impl AccountInfo {
    /// Create a record for an address whose details are not yet known.
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            balance: None,
            transaction_count: None,
        }
    }

    pub fn set_balance(&mut self, balance: impl Into<String>) {
        self.balance = Some(balance.into());
    }

    pub fn set_transaction_count(&mut self, count: u64) {
        self.transaction_count = Some(count);
    }

    /// Both dependent calls have completed.
    pub fn is_complete(&self) -> bool {
        self.balance.is_some() && self.transaction_count.is_some()
    }
}
