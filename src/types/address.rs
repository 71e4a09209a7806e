//! Textual account and validator-node identifiers.
//!
//! An account is not a stored entity: any public-key string appearing as a
//! sender, recipient, or reward address names an account, and its balance is
//! derived by replaying the chain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum width of an address field inside a payload.
pub const ADDRESS_LEN: usize = 50;

/// Maximum width of a node-id field inside a payload.
pub const NODE_ID_LEN: usize = 40;

/// Account identifier: the checksummed text form of a public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(text: impl Into<String>) -> Self {
        Address(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this address fits the fixed payload field.
    pub fn fits_payload(&self) -> bool {
        self.0.len() <= ADDRESS_LEN
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address::new(s)
    }
}

/// Identifier of a validator node in the reference subnet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(text: impl Into<String>) -> Self {
        NodeId(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId::new(s)
    }
}
