//! Shared helpers for chain tests.

#[cfg(test)]
pub mod utils {
    use crate::core::codec::{encode_message, Payload, TransactionRecord};
    use crate::core::staking::UptimeOracle;
    use crate::crypto::PrivateKey;
    use crate::types::address::NodeId;

    /// Builds a fully signed payload for `record` under a fresh key.
    pub fn signed_payload(record: &TransactionRecord) -> Payload {
        let key = PrivateKey::generate();
        let message = encode_message(record).expect("record fits its fields");
        let signature = key.sign(&message);
        Payload::assemble(&key.public_key().encoded(), &signature.encoded(), &message)
            .expect("assembled payload")
    }

    /// Uptime oracle with a fixed answer for every sample.
    pub struct ConstOracle(pub Option<bool>);

    impl UptimeOracle for ConstOracle {
        fn was_validating(&self, _node: &NodeId, _timestamp: u64) -> Option<bool> {
            self.0
        }
    }
}
