//! Chain block: a parent link, a timestamp, and one fixed-size payload.

use crate::core::codec::Payload;
use crate::types::id::BlockId;
use sha3::{Digest, Sha3_256};
use std::fmt;

/// Immutable block. Exactly one transaction payload per block; blocks are
/// validated once upon receipt and never modified.
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub parent_id: BlockId,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    pub payload: Payload,
}

impl Block {
    /// Creates a block, deriving its id from the identity fields.
    pub fn new(parent_id: BlockId, timestamp: u64, payload: Payload) -> Self {
        let id = derive_id(&parent_id, timestamp, &payload);
        Self {
            id,
            parent_id,
            timestamp,
            payload,
        }
    }

    /// A genesis block: zero parent sentinel, carries the given payload.
    pub fn genesis(timestamp: u64, payload: Payload) -> Self {
        Self::new(BlockId::ZERO, timestamp, payload)
    }

    /// Whether this block sits at the root of the chain.
    pub fn is_genesis(&self) -> bool {
        self.parent_id == BlockId::ZERO
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("parent_id", &self.parent_id)
            .field("timestamp", &self.timestamp)
            .field("payload", &self.payload)
            .finish()
    }
}

/// Computes a block id over a domain separator and the identity fields, so
/// two blocks differing in parent, time, or payload never collide.
fn derive_id(parent_id: &BlockId, timestamp: u64, payload: &Payload) -> BlockId {
    let mut hasher = Sha3_256::new();
    hasher.update(b"BLOCK");
    hasher.update(parent_id.as_slice());
    hasher.update(timestamp.to_be_bytes());
    hasher.update(payload.as_bytes());
    BlockId(hasher.finalize().into())
}
