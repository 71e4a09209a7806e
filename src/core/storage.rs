//! Block storage abstractions and the in-memory implementation.
//!
//! Defines the [`BlockStore`] trait with a two-phase write model: blocks are
//! staged by [`BlockStore::save_block`] and only become durable and visible
//! to ancestry walks after [`BlockStore::commit`].

use crate::core::block::Block;
use crate::types::id::BlockId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur while interacting with storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Staged block references a parent the store has never seen.
    #[error("unknown parent block {0}")]
    UnknownParent(BlockId),
    /// Backend write failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Storage backend for chain blocks.
///
/// Implementations must be thread-safe (`Send + Sync`) to support concurrent
/// access from service handlers.
pub trait BlockStore: Send + Sync {
    /// Retrieves a block by id, committed or staged.
    fn get_block(&self, id: &BlockId) -> Option<Arc<Block>>;

    /// Stages a block for the next commit.
    fn save_block(&self, block: Arc<Block>) -> Result<(), StorageError>;

    /// Makes all staged blocks durable, advancing the accepted tip.
    fn commit(&self) -> Result<(), StorageError>;

    /// Id of the most recently accepted block.
    fn last_accepted(&self) -> BlockId;
}

struct Inner {
    /// Committed blocks indexed by id.
    blocks: HashMap<BlockId, Arc<Block>>,
    /// Blocks saved but not yet committed, in save order.
    staged: Vec<Arc<Block>>,
    last_accepted: BlockId,
}

/// In-memory block store for development and tests.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates a store seeded with a committed genesis block.
    pub fn new(genesis: Arc<Block>) -> Self {
        let mut blocks = HashMap::new();
        let last_accepted = genesis.id;
        blocks.insert(genesis.id, genesis);
        MemoryStore {
            inner: Mutex::new(Inner {
                blocks,
                staged: Vec::new(),
                last_accepted,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning only happens if a holder panicked; the data is
        // plain maps, so continue with whatever state is there.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl BlockStore for MemoryStore {
    fn get_block(&self, id: &BlockId) -> Option<Arc<Block>> {
        let inner = self.lock();
        inner
            .blocks
            .get(id)
            .or_else(|| inner.staged.iter().find(|b| b.id == *id))
            .cloned()
    }

    fn save_block(&self, block: Arc<Block>) -> Result<(), StorageError> {
        let mut inner = self.lock();
        let parent_known = block.is_genesis()
            || inner.blocks.contains_key(&block.parent_id)
            || inner.staged.iter().any(|b| b.id == block.parent_id);
        if !parent_known {
            return Err(StorageError::UnknownParent(block.parent_id));
        }
        inner.staged.push(block);
        Ok(())
    }

    fn commit(&self) -> Result<(), StorageError> {
        let mut inner = self.lock();
        let staged = std::mem::take(&mut inner.staged);
        for block in staged {
            inner.last_accepted = block.id;
            inner.blocks.insert(block.id, block);
        }
        Ok(())
    }

    fn last_accepted(&self) -> BlockId {
        self.lock().last_accepted
    }
}
