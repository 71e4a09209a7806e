//! Balance accounting by ancestry replay.
//!
//! No balance is ever persisted. Every query folds the full ancestor chain
//! back to genesis and applies each block's transaction effect in order,
//! O(chain depth) per query. Correctness rests on each block having been
//! validated exactly once before being chained, so replay can use saturating
//! arithmetic without re-checking preconditions.

use crate::core::block::Block;
use crate::core::codec::{Amount, TransactionRecord};
use crate::core::config::ChainConfig;
use crate::core::staking::{StakeEvaluator, UptimeOracle};
use crate::core::storage::{BlockStore, StorageError};
use crate::types::address::Address;
use crate::types::id::BlockId;

/// Derives balances and the unallocated pool from chain history.
pub struct Ledger<'a, S: BlockStore, O: UptimeOracle> {
    store: &'a S,
    evaluator: StakeEvaluator<'a, O>,
    config: &'a ChainConfig,
}

impl<'a, S: BlockStore, O: UptimeOracle> Ledger<'a, S, O> {
    pub fn new(store: &'a S, oracle: &'a O, config: &'a ChainConfig) -> Self {
        Self {
            store,
            evaluator: StakeEvaluator::new(oracle, config),
            config,
        }
    }

    /// Spendable balance of `account` as of `block`, evaluated at local
    /// time `now`.
    ///
    /// `now` only matters for stake records: it decides whether a lock is
    /// in force and whether a matured reward has been earned.
    pub fn balance_of(
        &self,
        block: &Block,
        account: &Address,
        now: u64,
    ) -> Result<Amount, StorageError> {
        self.replay(block, 0, |balance, record| match record {
            TransactionRecord::Upload(u) if u.sender == *account => {
                balance.saturating_sub(self.config.upload_fee)
            }
            TransactionRecord::Transfer(t) => {
                let balance = if t.sender == *account {
                    balance.saturating_sub(t.amount)
                } else {
                    balance
                };
                if t.recipient == *account {
                    balance.saturating_add(t.amount)
                } else {
                    balance
                }
            }
            TransactionRecord::Faucet(f) if f.recipient == *account => {
                balance.saturating_add(f.amount)
            }
            TransactionRecord::Stake(s) if s.reward_address == *account => {
                if now >= s.start && now < s.end {
                    // Escrowed, not destroyed: the lock disappears once the
                    // window test fails.
                    balance.saturating_sub(s.amount)
                } else {
                    balance.saturating_add(self.evaluator.reward(s, now))
                }
            }
            _ => balance,
        })
    }

    /// The chain-wide unallocated pool as of `block`, evaluated at local
    /// time `now`.
    pub fn unallocated(&self, block: &Block, now: u64) -> Result<Amount, StorageError> {
        self.replay(
            block,
            self.config.genesis_allocation,
            |pool, record| match record {
                TransactionRecord::Upload(_) => pool.saturating_add(self.config.upload_fee),
                TransactionRecord::Faucet(f) => pool.saturating_sub(f.amount),
                TransactionRecord::Transfer(_) => pool,
                TransactionRecord::Stake(s) => pool.saturating_sub(self.evaluator.reward(s, now)),
            },
        )
    }

    /// Folds `apply` over every decodable record from genesis to `block`.
    ///
    /// Undecodable payloads (notably the all-NUL genesis payload) contribute
    /// nothing. A parent missing from the store aborts the walk.
    fn replay<F>(&self, block: &Block, init: Amount, mut apply: F) -> Result<Amount, StorageError>
    where
        F: FnMut(Amount, &TransactionRecord) -> Amount,
    {
        let mut records = Vec::new();
        if let Ok(record) = block.payload.record() {
            records.push(record);
        }

        let mut parent_id = block.parent_id;
        while parent_id != BlockId::ZERO {
            let parent = self
                .store
                .get_block(&parent_id)
                .ok_or(StorageError::UnknownParent(parent_id))?;
            if let Ok(record) = parent.payload.record() {
                records.push(record);
            }
            parent_id = parent.parent_id;
        }

        Ok(records
            .iter()
            .rev()
            .fold(init, |acc, record| apply(acc, record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::{
        encode_message, FaucetRecord, Payload, StakeRecord, TransferRecord, UploadRecord,
    };
    use crate::core::storage::MemoryStore;
    use crate::crypto::PrivateKey;
    use crate::utils::test_utils::utils::ConstOracle;
    use std::sync::Arc;

    const GENESIS_POOL: Amount = 5_000_000_000_000_000;

    fn payload_for(record: &TransactionRecord) -> Payload {
        let key = PrivateKey::generate();
        let message = encode_message(record).expect("encode");
        let signature = key.sign(&message);
        Payload::assemble(&key.public_key().encoded(), &signature.encoded(), &message)
            .expect("assemble")
    }

    struct Chain {
        store: MemoryStore,
        tip: Arc<Block>,
    }

    impl Chain {
        fn new() -> Self {
            let genesis = Arc::new(Block::genesis(0, Payload::zeroed()));
            let store = MemoryStore::new(genesis.clone());
            Chain {
                store,
                tip: genesis,
            }
        }

        fn extend(&mut self, record: &TransactionRecord) -> Arc<Block> {
            let block = Arc::new(Block::new(
                self.tip.id,
                self.tip.timestamp + 1,
                payload_for(record),
            ));
            self.store.save_block(block.clone()).unwrap();
            self.store.commit().unwrap();
            self.tip = block.clone();
            block
        }
    }

    fn faucet(amount: Amount, recipient: &str) -> TransactionRecord {
        TransactionRecord::Faucet(FaucetRecord {
            amount,
            recipient: recipient.into(),
        })
    }

    fn transfer(amount: Amount, sender: &str, recipient: &str) -> TransactionRecord {
        TransactionRecord::Transfer(TransferRecord {
            amount,
            sender: sender.into(),
            recipient: recipient.into(),
        })
    }

    #[test]
    fn genesis_seeds_the_pool_only() {
        let chain = Chain::new();
        let oracle = ConstOracle(Some(true));
        let config = ChainConfig::default();
        let ledger = Ledger::new(&chain.store, &oracle, &config);

        assert_eq!(ledger.unallocated(&chain.tip, 0).unwrap(), GENESIS_POOL);
        assert_eq!(
            ledger.balance_of(&chain.tip, &"anyone".into(), 0).unwrap(),
            0
        );
    }

    #[test]
    fn faucet_moves_funds_out_of_the_pool() {
        let mut chain = Chain::new();
        let oracle = ConstOracle(Some(true));
        let config = ChainConfig::default();
        chain.extend(&faucet(1000, "R"));

        let ledger = Ledger::new(&chain.store, &oracle, &config);
        assert_eq!(ledger.balance_of(&chain.tip, &"R".into(), 10).unwrap(), 1000);
        assert_eq!(
            ledger.unallocated(&chain.tip, 10).unwrap(),
            GENESIS_POOL - 1000
        );
    }

    #[test]
    fn transfer_moves_funds_between_accounts() {
        let mut chain = Chain::new();
        let oracle = ConstOracle(Some(true));
        let config = ChainConfig::default();
        chain.extend(&faucet(1000, "A"));
        chain.extend(&transfer(400, "A", "B"));

        let ledger = Ledger::new(&chain.store, &oracle, &config);
        assert_eq!(ledger.balance_of(&chain.tip, &"A".into(), 10).unwrap(), 600);
        assert_eq!(ledger.balance_of(&chain.tip, &"B".into(), 10).unwrap(), 400);
        // Transfers never touch the pool.
        assert_eq!(
            ledger.unallocated(&chain.tip, 10).unwrap(),
            GENESIS_POOL - 1000
        );
    }

    #[test]
    fn self_transfer_is_a_net_noop() {
        let mut chain = Chain::new();
        let oracle = ConstOracle(Some(true));
        let config = ChainConfig::default();
        chain.extend(&faucet(1000, "A"));
        chain.extend(&transfer(250, "A", "A"));

        let ledger = Ledger::new(&chain.store, &oracle, &config);
        assert_eq!(
            ledger.balance_of(&chain.tip, &"A".into(), 10).unwrap(),
            1000
        );
    }

    #[test]
    fn upload_fee_flows_into_the_pool() {
        let mut chain = Chain::new();
        let oracle = ConstOracle(Some(true));
        let config = ChainConfig::default();

        let key = PrivateKey::generate();
        let sender = key.public_key().address();
        chain.extend(&faucet(100, sender.as_str()));

        let record = TransactionRecord::Upload(UploadRecord {
            sender: sender.clone(),
        });
        let message = encode_message(&record).unwrap();
        let signature = key.sign(&message);
        let payload =
            Payload::assemble(&key.public_key().encoded(), &signature.encoded(), &message)
                .unwrap();
        let block = Arc::new(Block::new(chain.tip.id, chain.tip.timestamp + 1, payload));
        chain.store.save_block(block.clone()).unwrap();
        chain.store.commit().unwrap();

        let ledger = Ledger::new(&chain.store, &oracle, &config);
        assert_eq!(ledger.balance_of(&block, &sender, 10).unwrap(), 99);
        assert_eq!(
            ledger.unallocated(&block, 10).unwrap(),
            GENESIS_POOL - 100 + 1
        );
    }

    #[test]
    fn stake_lock_escrows_within_the_window() {
        let mut chain = Chain::new();
        let oracle = ConstOracle(Some(true));
        let config = ChainConfig::default();
        chain.extend(&faucet(1000, "S"));
        chain.extend(&TransactionRecord::Stake(StakeRecord {
            node: "node-1".into(),
            reward_address: "S".into(),
            start: 100,
            end: 700,
            amount: 600,
        }));

        let ledger = Ledger::new(&chain.store, &oracle, &config);
        let account: Address = "S".into();

        // Before the window: nothing locked yet.
        assert_eq!(ledger.balance_of(&chain.tip, &account, 50).unwrap(), 1000);
        // In-window: the stake is escrowed.
        assert_eq!(ledger.balance_of(&chain.tip, &account, 100).unwrap(), 400);
        assert_eq!(ledger.balance_of(&chain.tip, &account, 699).unwrap(), 400);
        // At end the lock is released; the reward only pays out strictly
        // after end.
        assert_eq!(ledger.balance_of(&chain.tip, &account, 700).unwrap(), 1000);
        assert_eq!(
            ledger.balance_of(&chain.tip, &account, 701).unwrap(),
            1000 + 600
        );
        // The matured reward is debited from the pool.
        assert_eq!(
            ledger.unallocated(&chain.tip, 701).unwrap(),
            GENESIS_POOL - 1000 - 600
        );
    }

    #[test]
    fn downtime_forfeits_the_matured_reward() {
        let mut chain = Chain::new();
        let oracle = ConstOracle(Some(false));
        let config = ChainConfig::default();
        chain.extend(&faucet(1000, "S"));
        chain.extend(&TransactionRecord::Stake(StakeRecord {
            node: "node-1".into(),
            reward_address: "S".into(),
            start: 100,
            end: 700,
            amount: 600,
        }));

        let ledger = Ledger::new(&chain.store, &oracle, &config);
        assert_eq!(
            ledger.balance_of(&chain.tip, &"S".into(), 701).unwrap(),
            1000
        );
        assert_eq!(
            ledger.unallocated(&chain.tip, 701).unwrap(),
            GENESIS_POOL - 1000
        );
    }

    #[test]
    fn missing_parent_aborts_the_walk() {
        let chain = Chain::new();
        let oracle = ConstOracle(Some(true));
        let config = ChainConfig::default();
        let ledger = Ledger::new(&chain.store, &oracle, &config);

        let orphan = Block::new(BlockId([7u8; 32]), 5, Payload::zeroed());
        assert!(matches!(
            ledger.balance_of(&orphan, &"A".into(), 10),
            Err(StorageError::UnknownParent(_))
        ));
    }
}
