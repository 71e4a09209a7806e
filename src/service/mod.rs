//! Operator and wallet-facing service handlers.
//!
//! Thin JSON-friendly wrappers over the core: every handler takes a serde
//! args struct and returns a serde reply struct, so an RPC transport can be
//! bolted on without touching the accounting code. All keys, signatures,
//! ids, and payload bytes cross this boundary as checksummed text.

use crate::core::block::Block;
use crate::core::codec::{Amount, DecodeError, Payload, TransactionRecord};
use crate::core::config::ChainConfig;
use crate::core::ledger::Ledger;
use crate::core::staking::{StakeEvaluator, UptimeOracle};
use crate::core::storage::{BlockStore, StorageError};
use crate::core::validator::{BlockValidator, ConsensusBase, ValidationError};
use crate::crypto::{verify_encoded, PrivateKey};
use crate::info;
use crate::types::address::Address;
use crate::types::formatting::{self, FormatError};
use crate::types::id::BlockId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to service callers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid text encoding: {0}")]
    InvalidEncoding(#[from] FormatError),

    #[error("invalid payload: {0}")]
    Malformed(#[from] DecodeError),

    #[error("block rejected: {0}")]
    Rejected(#[from] ValidationError),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("no block with id {0}")]
    UnknownBlock(BlockId),

    #[error("block {0} does not carry a stake record")]
    NotAStake(BlockId),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProposeBlockArgs {
    /// Full payload bytes, checksummed-text encoded.
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProposeBlockReply {
    pub id: String,
    pub timestamp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetBlockArgs {
    /// Block id; `None` fetches the latest accepted block.
    pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetBlockReply {
    pub id: String,
    pub parent_id: String,
    pub timestamp: u64,
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetBlockHeightReply {
    /// Number of ancestors between the accepted tip and genesis.
    pub height: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetStorageCostReply {
    /// Fee debited per upload, credited to the unallocated pool.
    pub cost: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetBalanceArgs {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetBalanceReply {
    pub balance: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetUnallocatedFundsReply {
    pub balance: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAddressReply {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifySignatureArgs {
    pub public_key: String,
    /// Message bytes, checksummed-text encoded.
    pub message: String,
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifySignatureReply {
    pub valid: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecodePayloadArgs {
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecodePayloadReply {
    pub signer: String,
    pub signature: String,
    /// The signed message region, checksummed-text encoded.
    pub message: String,
    pub record: TransactionRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetStakeRewardArgs {
    /// Id of the block carrying the stake record.
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetStakeRewardReply {
    pub reward: Amount,
}

fn system_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Service facade wiring the store, oracle, and consensus base together.
pub struct Service<S: BlockStore, O: UptimeOracle, C: ConsensusBase> {
    store: Arc<S>,
    oracle: Arc<O>,
    consensus: Arc<C>,
    config: ChainConfig,
    clock: fn() -> u64,
}

impl<S: BlockStore, O: UptimeOracle, C: ConsensusBase> Service<S, O, C> {
    pub fn new(store: Arc<S>, oracle: Arc<O>, consensus: Arc<C>, config: ChainConfig) -> Self {
        Self {
            store,
            oracle,
            consensus,
            config,
            clock: system_now,
        }
    }

    /// Replaces the wall clock, for deterministic tests.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Builds a block on the current tip from encoded payload bytes and
    /// runs it through validation.
    pub fn propose_block(&self, args: ProposeBlockArgs) -> Result<ProposeBlockReply, ServiceError> {
        let bytes = formatting::decode(&args.payload)?;
        let payload = Payload::from_bytes(&bytes)?;

        let now = (self.clock)();
        let parent = self.tip()?;
        // Local proposer: the timestamp must clear the parent even when the
        // clock has not advanced since the last block.
        let timestamp = now.max(parent.timestamp + 1);
        let block = Arc::new(Block::new(parent.id, timestamp, payload));

        let validator = BlockValidator::new(
            self.store.as_ref(),
            self.oracle.as_ref(),
            self.consensus.as_ref(),
            &self.config,
        );
        validator.verify(&block, now)?;
        info!("proposed block {} accepted", block.id);

        Ok(ProposeBlockReply {
            id: block.id.to_string(),
            timestamp,
        })
    }

    pub fn get_block(&self, args: GetBlockArgs) -> Result<GetBlockReply, ServiceError> {
        let block = match args.id {
            Some(text) => {
                let id = BlockId::from_str(&text)?;
                self.store
                    .get_block(&id)
                    .ok_or(ServiceError::UnknownBlock(id))?
            }
            None => self.tip()?,
        };

        Ok(GetBlockReply {
            id: block.id.to_string(),
            parent_id: block.parent_id.to_string(),
            timestamp: block.timestamp,
            payload: formatting::encode(block.payload.as_bytes()),
        })
    }

    /// Height of the accepted tip: genesis sits at height 0.
    ///
    /// Derived by walking to the genesis sentinel, like every other chain
    /// property here.
    pub fn get_block_height(&self) -> Result<GetBlockHeightReply, ServiceError> {
        let mut height = 0;
        let mut block = self.tip()?;
        while block.parent_id != BlockId::ZERO {
            block = self
                .store
                .get_block(&block.parent_id)
                .ok_or(ServiceError::UnknownBlock(block.parent_id))?;
            height += 1;
        }
        Ok(GetBlockHeightReply { height })
    }

    /// The fee an upload costs its signer.
    pub fn get_storage_cost(&self) -> GetStorageCostReply {
        GetStorageCostReply {
            cost: self.config.upload_fee,
        }
    }

    pub fn get_balance(&self, args: GetBalanceArgs) -> Result<GetBalanceReply, ServiceError> {
        let tip = self.tip()?;
        let ledger = Ledger::new(self.store.as_ref(), self.oracle.as_ref(), &self.config);
        let account = Address::from(args.address.as_str());
        let balance = ledger.balance_of(&tip, &account, (self.clock)())?;
        Ok(GetBalanceReply { balance })
    }

    pub fn get_unallocated_funds(&self) -> Result<GetUnallocatedFundsReply, ServiceError> {
        let tip = self.tip()?;
        let ledger = Ledger::new(self.store.as_ref(), self.oracle.as_ref(), &self.config);
        let balance = ledger.unallocated(&tip, (self.clock)())?;
        Ok(GetUnallocatedFundsReply { balance })
    }

    /// Generates a fresh keypair whose address fits a payload field.
    pub fn create_address(&self) -> CreateAddressReply {
        let key = PrivateKey::generate();
        CreateAddressReply {
            private_key: key.encoded().to_string(),
            public_key: key.public_key().encoded(),
        }
    }

    /// Checks an arbitrary (pubkey, message, signature) triple.
    pub fn verify_signature(
        &self,
        args: VerifySignatureArgs,
    ) -> Result<VerifySignatureReply, ServiceError> {
        let message = formatting::decode(&args.message)?;
        Ok(VerifySignatureReply {
            valid: verify_encoded(&args.public_key, &message, &args.signature),
        })
    }

    /// Debug decoder: reports the parsed pieces of a raw payload.
    pub fn decode_payload(
        &self,
        args: DecodePayloadArgs,
    ) -> Result<DecodePayloadReply, ServiceError> {
        let bytes = formatting::decode(&args.payload)?;
        let payload = Payload::from_bytes(&bytes)?;
        Ok(DecodePayloadReply {
            signer: payload.signer_text()?.to_string(),
            signature: payload.signature_text()?.to_string(),
            message: formatting::encode(payload.message()),
            record: payload.record()?,
        })
    }

    /// Current reward of the stake carried by the given block.
    pub fn get_stake_reward(
        &self,
        args: GetStakeRewardArgs,
    ) -> Result<GetStakeRewardReply, ServiceError> {
        let id = BlockId::from_str(&args.id)?;
        let block = self
            .store
            .get_block(&id)
            .ok_or(ServiceError::UnknownBlock(id))?;

        let TransactionRecord::Stake(record) = block.payload.record()? else {
            return Err(ServiceError::NotAStake(id));
        };

        let evaluator = StakeEvaluator::new(self.oracle.as_ref(), &self.config);
        Ok(GetStakeRewardReply {
            reward: evaluator.reward(&record, (self.clock)()),
        })
    }

    fn tip(&self) -> Result<Arc<Block>, ServiceError> {
        let id = self.store.last_accepted();
        self.store
            .get_block(&id)
            .ok_or(ServiceError::UnknownBlock(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::{encode_message, FaucetRecord, StakeRecord};
    use crate::core::storage::MemoryStore;
    use crate::utils::test_utils::utils::{signed_payload, ConstOracle};

    struct LocalConsensus;
    impl ConsensusBase for LocalConsensus {
        fn verify(&self, _block: &Block) -> Result<bool, ValidationError> {
            Ok(false)
        }
    }

    fn service() -> Service<MemoryStore, ConstOracle, LocalConsensus> {
        let genesis = Arc::new(Block::genesis(1000, Payload::zeroed()));
        Service::new(
            Arc::new(MemoryStore::new(genesis)),
            Arc::new(ConstOracle(Some(true))),
            Arc::new(LocalConsensus),
            ChainConfig::default(),
        )
        .with_clock(|| 2000)
    }

    fn faucet_payload(amount: Amount, recipient: &str) -> String {
        let payload = signed_payload(&TransactionRecord::Faucet(FaucetRecord {
            amount,
            recipient: recipient.into(),
        }));
        formatting::encode(payload.as_bytes())
    }

    #[test]
    fn propose_then_read_back() {
        let service = service();
        let reply = service
            .propose_block(ProposeBlockArgs {
                payload: faucet_payload(1000, "R"),
            })
            .unwrap();

        let latest = service.get_block(GetBlockArgs { id: None }).unwrap();
        assert_eq!(latest.id, reply.id);

        let by_id = service
            .get_block(GetBlockArgs {
                id: Some(reply.id.clone()),
            })
            .unwrap();
        assert_eq!(by_id.timestamp, reply.timestamp);
    }

    #[test]
    fn balances_follow_proposals() {
        let service = service();
        service
            .propose_block(ProposeBlockArgs {
                payload: faucet_payload(1000, "R"),
            })
            .unwrap();

        let balance = service
            .get_balance(GetBalanceArgs {
                address: "R".to_string(),
            })
            .unwrap();
        assert_eq!(balance.balance, 1000);

        let pool = service.get_unallocated_funds().unwrap();
        assert_eq!(pool.balance, 5_000_000_000_000_000 - 1000);
    }

    #[test]
    fn block_height_counts_ancestors_from_the_tip() {
        let service = service();
        assert_eq!(service.get_block_height().unwrap().height, 0);

        service
            .propose_block(ProposeBlockArgs {
                payload: faucet_payload(100, "A"),
            })
            .unwrap();
        service
            .propose_block(ProposeBlockArgs {
                payload: faucet_payload(100, "B"),
            })
            .unwrap();

        assert_eq!(service.get_block_height().unwrap().height, 2);
    }

    #[test]
    fn storage_cost_reports_the_upload_fee() {
        let genesis = Arc::new(Block::genesis(1000, Payload::zeroed()));
        let mut config = ChainConfig::default();
        config.upload_fee = 7;
        let service = Service::new(
            Arc::new(MemoryStore::new(genesis)),
            Arc::new(ConstOracle(Some(true))),
            Arc::new(LocalConsensus),
            config,
        );
        assert_eq!(service.get_storage_cost().cost, 7);
    }

    #[test]
    fn rejected_proposal_reports_the_reason() {
        let service = service();
        let err = service
            .propose_block(ProposeBlockArgs {
                payload: faucet_payload(6_000_000_000_000_000, "R"),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(ValidationError::FaucetEmpty { .. })
        ));
    }

    #[test]
    fn garbage_payload_text_is_recoverable() {
        let service = service();
        let err = service
            .propose_block(ProposeBlockArgs {
                payload: "not-an-encoding!".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidEncoding(_)));
    }

    #[test]
    fn created_address_verifies_its_own_signatures() {
        let service = service();
        let created = service.create_address();

        let key = PrivateKey::from_encoded(&created.private_key).unwrap();
        let message = b"service roundtrip";
        let signature = key.sign(message);

        let reply = service
            .verify_signature(VerifySignatureArgs {
                public_key: created.public_key,
                message: formatting::encode(message),
                signature: signature.encoded(),
            })
            .unwrap();
        assert!(reply.valid);
    }

    #[test]
    fn decode_payload_reports_the_parsed_parts() {
        let service = service();
        let record = TransactionRecord::Faucet(FaucetRecord {
            amount: 77,
            recipient: "R".into(),
        });
        let payload = signed_payload(&record);

        let reply = service
            .decode_payload(DecodePayloadArgs {
                payload: formatting::encode(payload.as_bytes()),
            })
            .unwrap();
        assert_eq!(reply.record, record);
        assert_eq!(reply.signer, payload.signer_text().unwrap());
    }

    #[test]
    fn stake_reward_is_zero_until_matured() {
        let service = service();
        // Window satisfies lead time (>= 2030) and duration (>= 60s).
        let record = TransactionRecord::Stake(StakeRecord {
            node: "node-1".into(),
            reward_address: "S".into(),
            start: 2030,
            end: 2100,
            amount: 0,
        });
        let payload = signed_payload(&record);
        let reply = service
            .propose_block(ProposeBlockArgs {
                payload: formatting::encode(payload.as_bytes()),
            })
            .unwrap();

        let reward = service
            .get_stake_reward(GetStakeRewardArgs {
                id: reply.id.clone(),
            })
            .unwrap();
        // The clock sits at 2000, before the window even starts.
        assert_eq!(reward.reward, 0);
    }

    #[test]
    fn stake_reward_rejects_non_stake_blocks() {
        let service = service();
        let reply = service
            .propose_block(ProposeBlockArgs {
                payload: faucet_payload(10, "R"),
            })
            .unwrap();

        let err = service
            .get_stake_reward(GetStakeRewardArgs { id: reply.id })
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotAStake(_)));
    }

    #[test]
    fn encode_message_is_what_gets_signed() {
        // The service-facing contract: signing encode_message output and
        // assembling yields a payload the validator accepts.
        let record = TransactionRecord::Faucet(FaucetRecord {
            amount: 5,
            recipient: "R".into(),
        });
        let message = encode_message(&record).unwrap();
        let key = PrivateKey::generate();
        let signature = key.sign(&message);
        let payload =
            Payload::assemble(&key.public_key().encoded(), &signature.encoded(), &message)
                .unwrap();

        let service = service();
        service
            .propose_block(ProposeBlockArgs {
                payload: formatting::encode(payload.as_bytes()),
            })
            .unwrap();
    }
}
