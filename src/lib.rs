//! Accounting core of a file-storage chain.
//!
//! Provides the fixed-layout payload codec, recoverable-signature crypto,
//! the ancestry-replay ledger, staking reward evaluation, block validation,
//! and a thin service facade.

pub mod core;
pub mod crypto;
pub mod service;
pub mod types;
pub mod utils;
