//! Block validity state machine.
//!
//! A proposed block either passes every check and is persisted, or is
//! rejected with the error of the first failing check. Rejection is fatal
//! only for the candidate block; the validator holds no retry policy.

use crate::core::block::Block;
use crate::core::codec::{DecodeError, TransactionRecord};
use crate::core::config::ChainConfig;
use crate::core::ledger::Ledger;
use crate::core::staking::UptimeOracle;
use crate::core::storage::{BlockStore, StorageError};
use crate::crypto::verify_encoded;
use crate::{info, warn};
use std::sync::Arc;
use thiserror::Error;

/// Reasons a proposed block is rejected.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("payload rejected: {0}")]
    Malformed(#[from] DecodeError),

    #[error("failed to read from storage: {0}")]
    DatabaseGet(StorageError),

    #[error("failed to persist block: {0}")]
    DatabaseSave(StorageError),

    #[error("block timestamp {block} does not exceed parent timestamp {parent}")]
    TimestampTooEarly { block: u64, parent: u64 },

    #[error("block timestamp {block} exceeds local time limit {limit}")]
    TimestampTooLate { block: u64, limit: u64 },

    #[error("signature does not verify under the embedded public key")]
    InvalidSignature,

    #[error("account holds {available}, needs {needed}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("faucet request for {requested} exceeds unallocated pool of {available}")]
    FaucetEmpty { requested: u64, available: u64 },

    #[error("staking window violates lead-time or minimum-duration rules")]
    StakingPeriodInvalid,

    #[error("consensus handed the validator a foreign block type")]
    BlockTypeMismatch,
}

/// Structural checks owned by the consensus engine.
///
/// Implementations report `true` when the block is already accepted, which
/// short-circuits validation as success.
pub trait ConsensusBase: Send + Sync {
    fn verify(&self, block: &Block) -> Result<bool, ValidationError>;
}

/// Validates candidate blocks against the chain held in `store`.
pub struct BlockValidator<'a, S: BlockStore, O: UptimeOracle, C: ConsensusBase> {
    store: &'a S,
    oracle: &'a O,
    consensus: &'a C,
    config: &'a ChainConfig,
}

impl<'a, S: BlockStore, O: UptimeOracle, C: ConsensusBase> BlockValidator<'a, S, O, C> {
    pub fn new(store: &'a S, oracle: &'a O, consensus: &'a C, config: &'a ChainConfig) -> Self {
        Self {
            store,
            oracle,
            consensus,
            config,
        }
    }

    /// Runs the ordered validity checks on `block` and persists it on
    /// success. `now` is the caller's local Unix time.
    pub fn verify(&self, block: &Arc<Block>, now: u64) -> Result<(), ValidationError> {
        match self.run_checks(block, now) {
            Ok(()) => {
                info!("accepted block {} at timestamp {}", block.id, block.timestamp);
                Ok(())
            }
            Err(err) => {
                warn!("rejected block {}: {}", block.id, err);
                Err(err)
            }
        }
    }

    fn run_checks(&self, block: &Arc<Block>, now: u64) -> Result<(), ValidationError> {
        if self.consensus.verify(block)? {
            return Ok(());
        }

        let parent = self.store.get_block(&block.parent_id).ok_or_else(|| {
            ValidationError::DatabaseGet(StorageError::UnknownParent(block.parent_id))
        })?;

        if block.timestamp <= parent.timestamp {
            return Err(ValidationError::TimestampTooEarly {
                block: block.timestamp,
                parent: parent.timestamp,
            });
        }
        let limit = now.saturating_add(self.config.max_future_drift);
        if block.timestamp > limit {
            return Err(ValidationError::TimestampTooLate {
                block: block.timestamp,
                limit,
            });
        }

        let record = block.payload.record()?;
        let signer = block.payload.signer_text()?;
        let signature = block.payload.signature_text()?;
        if !verify_encoded(signer, block.payload.message(), signature) {
            return Err(ValidationError::InvalidSignature);
        }

        let ledger = Ledger::new(self.store, self.oracle, self.config);
        match &record {
            TransactionRecord::Upload(u) => {
                let available = self.balance(&ledger, &parent, &u.sender, now)?;
                if available < self.config.upload_fee {
                    return Err(ValidationError::InsufficientBalance {
                        needed: self.config.upload_fee,
                        available,
                    });
                }
            }
            TransactionRecord::Transfer(t) => {
                let available = self.balance(&ledger, &parent, &t.sender, now)?;
                if available < t.amount {
                    return Err(ValidationError::InsufficientBalance {
                        needed: t.amount,
                        available,
                    });
                }
            }
            TransactionRecord::Faucet(f) => {
                let available = ledger
                    .unallocated(&parent, now)
                    .map_err(ValidationError::DatabaseGet)?;
                if f.amount > available {
                    return Err(ValidationError::FaucetEmpty {
                        requested: f.amount,
                        available,
                    });
                }
            }
            TransactionRecord::Stake(s) => {
                if s.start < now.saturating_add(self.config.stake_lead_time)
                    || s.end.saturating_sub(s.start) < self.config.stake_min_duration
                {
                    return Err(ValidationError::StakingPeriodInvalid);
                }
                let available = self.balance(&ledger, &parent, &s.reward_address, now)?;
                if available < s.amount {
                    return Err(ValidationError::InsufficientBalance {
                        needed: s.amount,
                        available,
                    });
                }
            }
        }

        self.store
            .save_block(block.clone())
            .map_err(ValidationError::DatabaseSave)?;
        self.store
            .commit()
            .map_err(ValidationError::DatabaseSave)?;
        Ok(())
    }

    fn balance(
        &self,
        ledger: &Ledger<'a, S, O>,
        parent: &Block,
        account: &crate::types::address::Address,
        now: u64,
    ) -> Result<u64, ValidationError> {
        ledger
            .balance_of(parent, account, now)
            .map_err(ValidationError::DatabaseGet)
    }
}
