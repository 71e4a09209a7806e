//! Core chain accounting.
//!
//! This module contains the accounting heart of the chain:
//! - `codec`: the fixed-layout binary payload format
//! - `block`: immutable blocks linked by parent id
//! - `ledger`: balance derivation by ancestry replay
//! - `staking`: matured-stake reward evaluation
//! - `validator`: the block-validity state machine
//! - `storage`: the block store abstraction

pub mod block;
pub mod codec;
pub mod config;
pub mod ledger;
pub mod staking;
pub mod storage;
pub mod validator;
