//! Single-node demo of the chain accounting core.
//!
//! Seeds a genesis block into an in-memory store, generates two keypairs,
//! then drives the service facade through a faucet grant and a transfer,
//! printing each reply as JSON.

use filechain::core::block::Block;
use filechain::core::codec::{
    encode_message, FaucetRecord, Payload, StakeRecord, TransactionRecord, TransferRecord,
};
use filechain::core::config::ChainConfig;
use filechain::core::staking::{OracleConfig, UptimeOracle};
use filechain::core::storage::MemoryStore;
use filechain::core::validator::{ConsensusBase, ValidationError};
use filechain::crypto::PrivateKey;
use filechain::service::{
    GetBalanceArgs, GetBlockArgs, GetStakeRewardArgs, ProposeBlockArgs, Service,
};
use filechain::types::address::NodeId;
use filechain::types::formatting;
use filechain::{error, info};
use std::process;
use std::sync::Arc;

/// Standalone node: no historical index to consult, so every stake sample
/// counts as validating.
struct AlwaysUpOracle;

impl UptimeOracle for AlwaysUpOracle {
    fn was_validating(&self, _node: &NodeId, _timestamp: u64) -> Option<bool> {
        Some(true)
    }
}

/// Standalone node: no consensus engine, nothing is ever pre-accepted.
struct LocalConsensus;

impl ConsensusBase for LocalConsensus {
    fn verify(&self, _block: &Block) -> Result<bool, ValidationError> {
        Ok(false)
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn signed_payload_text(key: &PrivateKey, record: &TransactionRecord) -> String {
    let message = match encode_message(record) {
        Ok(message) => message,
        Err(err) => {
            error!("could not encode record: {}", err);
            process::exit(1);
        }
    };
    let signature = key.sign(&message);
    match Payload::assemble(&key.public_key().encoded(), &signature.encoded(), &message) {
        Ok(payload) => formatting::encode(payload.as_bytes()),
        Err(err) => {
            error!("could not assemble payload: {}", err);
            process::exit(1);
        }
    }
}

fn main() {
    let genesis = Arc::new(Block::genesis(unix_now().saturating_sub(60), Payload::zeroed()));
    info!("seeded genesis block {}", genesis.id);

    let oracle_config = OracleConfig::default();
    info!(
        "standalone mode, skipping uptime oracle at {} (subnet {})",
        oracle_config.endpoint, oracle_config.subnet_id
    );

    let service = Service::new(
        Arc::new(MemoryStore::new(genesis)),
        Arc::new(AlwaysUpOracle),
        Arc::new(LocalConsensus),
        ChainConfig::default(),
    );

    let alice = PrivateKey::generate();
    let bob = PrivateKey::generate();
    let alice_address = alice.public_key().address();
    let bob_address = bob.public_key().address();
    info!("alice: {}", alice_address);
    info!("bob:   {}", bob_address);

    let faucet = TransactionRecord::Faucet(FaucetRecord {
        amount: 10_000,
        recipient: alice_address.clone(),
    });
    run(&service, signed_payload_text(&alice, &faucet));

    let transfer = TransactionRecord::Transfer(TransferRecord {
        amount: 2_500,
        sender: alice_address.clone(),
        recipient: bob_address.clone(),
    });
    run(&service, signed_payload_text(&alice, &transfer));

    let now = unix_now();
    let stake = TransactionRecord::Stake(StakeRecord {
        node: "NodeID-7Xhw2mDxuDS44j42TCB6U5579esbSt3Lg".into(),
        reward_address: bob_address.clone(),
        start: now + 60,
        end: now + 180,
        amount: 1_000,
    });
    let stake_id = run(&service, signed_payload_text(&bob, &stake));
    match service.get_stake_reward(GetStakeRewardArgs { id: stake_id }) {
        Ok(reply) => info!("stake reward so far: {}", reply.reward),
        Err(err) => error!("stake reward query failed: {}", err),
    }

    for address in [&alice_address, &bob_address] {
        match service.get_balance(GetBalanceArgs {
            address: address.to_string(),
        }) {
            Ok(reply) => info!("balance of {}: {}", address, reply.balance),
            Err(err) => error!("balance query failed: {}", err),
        }
    }
    match service.get_unallocated_funds() {
        Ok(reply) => info!("unallocated pool: {}", reply.balance),
        Err(err) => error!("pool query failed: {}", err),
    }

    match service.get_block(GetBlockArgs { id: None }) {
        Ok(reply) => match serde_json::to_string_pretty(&reply) {
            Ok(json) => info!("latest block:\n{}", json),
            Err(err) => error!("serialization failed: {}", err),
        },
        Err(err) => error!("latest block query failed: {}", err),
    }
}

fn run(
    service: &Service<MemoryStore, AlwaysUpOracle, LocalConsensus>,
    payload: String,
) -> String {
    match service.propose_block(ProposeBlockArgs { payload }) {
        Ok(reply) => {
            info!("accepted block {} at {}", reply.id, reply.timestamp);
            reply.id
        }
        Err(err) => {
            error!("proposal rejected: {}", err);
            process::exit(1);
        }
    }
}
