//! Transactions recorded in blocks.
//!
//! A transaction is an opaque transfer record: sender and recipient are
//! free-form wallet identifiers and the amount is not checked against any
//! balance. The only structural guarantee is that every field is present.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Sender used for the coinbase-style reward a node pays itself when mining.
pub const REWARD_SENDER: &str = "0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// Reward paid to `recipient` for sealing a block.
    pub fn reward(recipient: impl Into<String>, amount: f64) -> Self {
        Self::new(REWARD_SENDER, recipient, amount)
    }

    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }

    /// Canonical JSON form used when hashing the enclosing block.
    /// Keys are written in sorted order.
    pub fn canonical_value(&self) -> Value {
        json!({
            "amount": self.amount,
            "recipient": self.recipient,
            "sender": self.sender,
        })
    }
}
