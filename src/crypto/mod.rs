//! Cryptographic primitives: recoverable secp256k1 signatures.

pub mod key_pair;

pub use key_pair::{verify_encoded, PrivateKey, PublicKey, RecoverableSignature};
