//! Staking reward evaluation against a historical validator-uptime oracle.

use crate::core::codec::{Amount, StakeRecord};
use crate::core::config::ChainConfig;
use crate::types::address::NodeId;
use crate::warn;
use serde::{Deserialize, Serialize};

/// Historical validator-set membership source.
///
/// `None` means the status could not be determined (endpoint unreachable,
/// deadline exceeded, height not indexed); reward evaluation treats unknown
/// status the same as "not validating" and withholds the reward.
pub trait UptimeOracle: Send + Sync {
    /// Was `node` an active validator of the reference subnet at `timestamp`?
    fn was_validating(&self, node: &NodeId, timestamp: u64) -> Option<bool>;
}

/// Connection parameters for a network-backed uptime oracle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Chain-index endpoint answering historical validator-set queries.
    pub endpoint: String,
    /// Subnet whose validator set stakes are measured against.
    pub subnet_id: String,
    /// Per-query deadline in seconds.
    pub timeout: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9650".to_string(),
            subnet_id: "11111111111111111111111111111111LpoYY".to_string(),
            timeout: 5,
        }
    }
}

/// Computes the reward a matured stake has earned.
pub struct StakeEvaluator<'a, O: UptimeOracle> {
    oracle: &'a O,
    config: &'a ChainConfig,
}

impl<'a, O: UptimeOracle> StakeEvaluator<'a, O> {
    pub fn new(oracle: &'a O, config: &'a ChainConfig) -> Self {
        Self { oracle, config }
    }

    /// Reward for `record` as of local time `now`.
    ///
    /// Returns `0` until the stake window has fully passed (`now > end`).
    /// A matured stake is sampled at fixed intervals across `[start, end)`;
    /// a single failed or unknown sample forfeits the whole reward. When
    /// every sample confirms the node was validating, the reward is
    /// `reward_rate_per_second * (end - start)`.
    pub fn reward(&self, record: &StakeRecord, now: u64) -> Amount {
        if now <= record.end {
            return 0;
        }

        let mut sample = record.start;
        while sample < record.end {
            match self.oracle.was_validating(&record.node, sample) {
                Some(true) => {}
                Some(false) => return 0,
                None => {
                    warn!(
                        "uptime status unknown for {} at {}, withholding reward",
                        record.node, sample
                    );
                    return 0;
                }
            }
            sample = sample.saturating_add(self.config.uptime_sample_interval);
        }

        self.config
            .reward_rate_per_second
            .saturating_mul(record.end.saturating_sub(record.start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::utils::ConstOracle;

    /// Oracle that fails exactly one checkpoint.
    struct FlakyOracle {
        down_at: u64,
    }

    impl UptimeOracle for FlakyOracle {
        fn was_validating(&self, _node: &NodeId, timestamp: u64) -> Option<bool> {
            Some(timestamp != self.down_at)
        }
    }

    fn stake(start: u64, end: u64) -> StakeRecord {
        StakeRecord {
            node: "NodeID-7Xhw2mDxuDS44j42TCB6U5579esbSt3Lg".into(),
            reward_address: "staker".into(),
            start,
            end,
            amount: 100,
        }
    }

    fn config() -> ChainConfig {
        ChainConfig::default()
    }

    #[test]
    fn unmatured_stake_earns_nothing() {
        let oracle = ConstOracle(Some(true));
        let config = config();
        let evaluator = StakeEvaluator::new(&oracle, &config);
        let record = stake(1000, 2000);

        assert_eq!(evaluator.reward(&record, 1500), 0);
        // Maturity is strictly after the end time.
        assert_eq!(evaluator.reward(&record, 2000), 0);
        assert_eq!(evaluator.reward(&record, 2001), 1000);
    }

    #[test]
    fn full_uptime_pays_rate_times_duration() {
        let oracle = ConstOracle(Some(true));
        let mut config = config();
        config.reward_rate_per_second = 3;
        let evaluator = StakeEvaluator::new(&oracle, &config);

        assert_eq!(evaluator.reward(&stake(1000, 1600), 5000), 1800);
    }

    #[test]
    fn single_missed_sample_forfeits_everything() {
        // Samples land on 1000, 1300, 1600, 1900; fail only the third.
        let oracle = FlakyOracle { down_at: 1600 };
        let config = config();
        let evaluator = StakeEvaluator::new(&oracle, &config);

        assert_eq!(evaluator.reward(&stake(1000, 2000), 5000), 0);
    }

    #[test]
    fn sample_at_end_is_not_taken() {
        // The window is half-open: a failure exactly at `end` is ignored.
        let oracle = FlakyOracle { down_at: 1600 };
        let config = config();
        let evaluator = StakeEvaluator::new(&oracle, &config);

        assert_eq!(evaluator.reward(&stake(1000, 1600), 5000), 600);
    }

    #[test]
    fn unknown_status_withholds_reward() {
        let oracle = ConstOracle(None);
        let config = config();
        let evaluator = StakeEvaluator::new(&oracle, &config);

        assert_eq!(evaluator.reward(&stake(1000, 2000), 5000), 0);
    }
}
