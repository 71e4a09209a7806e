//! Chain parameters.

use crate::core::codec::Amount;
use serde::{Deserialize, Serialize};

/// Economic and timing parameters of the chain.
///
/// Every parameter has a reference-network default; tests and alternative
/// deployments override individual fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Flat fee debited from the signer of every upload, credited to the
    /// unallocated pool.
    pub upload_fee: Amount,
    /// Reward units accrued per second of stake duration.
    pub reward_rate_per_second: Amount,
    /// Minimum seconds between stake submission and its start time.
    pub stake_lead_time: u64,
    /// Minimum seconds a stake must span.
    pub stake_min_duration: u64,
    /// Seconds between uptime-oracle samples when evaluating a matured stake.
    pub uptime_sample_interval: u64,
    /// Maximum seconds a block timestamp may sit ahead of local time.
    pub max_future_drift: u64,
    /// Currency units seeded into the unallocated pool at genesis.
    pub genesis_allocation: Amount,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            upload_fee: 1,
            reward_rate_per_second: 1,
            stake_lead_time: 30,
            stake_min_duration: 60,
            uptime_sample_interval: 300,
            max_future_drift: 3600,
            genesis_allocation: 5_000_000_000_000_000,
        }
    }
}
