//! 32-byte block identifiers.

use crate::types::formatting::{self, FormatError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Block identifier length in bytes.
pub const ID_LEN: usize = 32;

/// Fixed-size 32-byte identifier assigned to every block by the consensus
/// engine at proposal time.
///
/// This type is `Copy` - ids are passed constantly during ancestry walks and
/// should live on the stack. The all-zero id is the genesis sentinel: a block
/// whose parent is [`BlockId::ZERO`] terminates every ancestry walk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub [u8; ID_LEN]);

impl BlockId {
    /// The genesis sentinel: marks "no parent".
    pub const ZERO: BlockId = BlockId([0u8; ID_LEN]);

    /// Returns the id as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Builds an id from raw bytes, requiring exactly [`ID_LEN`] of them.
    pub fn from_bytes(bytes: &[u8]) -> Option<BlockId> {
        let raw: [u8; ID_LEN] = bytes.try_into().ok()?;
        Some(BlockId(raw))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", formatting::encode(&self.0))
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self)
    }
}

impl FromStr for BlockId {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = formatting::decode(s)?;
        BlockId::from_bytes(&bytes).ok_or(FormatError::TooShort)
    }
}
