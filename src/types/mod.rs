//! Core type definitions for ledger primitives.
//!
//! - `BlockId`: fixed-size 32-byte block identifiers with a genesis sentinel
//! - `Address` / `NodeId`: textual account and validator identifiers
//! - `formatting`: the checksummed base-58 text encoding used for all
//!   externally exchanged keys, signatures, and ids

pub mod address;
pub mod formatting;
pub mod id;
