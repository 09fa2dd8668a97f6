//! Consensus parameters consumed by the retarget algorithm and header validation

use crate::constants::{DIFFICULTY_ONE_BITS, TARGET_TIMESPAN, TARGET_TIME_PER_BLOCK};
use crate::error::{ConsensusError, Result};
use crate::target::Target;
use crate::uint::UInt256;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Difficulty and chain-anchoring parameters of one network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Easiest allowed target
    pub pow_limit: Target,
    /// Seconds one retarget period should take
    pub pow_target_timespan: u64,
    /// Seconds between blocks
    pub pow_target_spacing: u64,
    /// Testnet rule: a block may use `pow_limit` after a long gap
    #[serde(default)]
    pub pow_allow_min_difficulty_blocks: bool,
    /// Regtest rule: difficulty never changes
    #[serde(default)]
    pub pow_no_retargeting: bool,
    /// Hash the height-0 header must have, if the network pins one
    #[serde(default)]
    pub genesis_hash: Option<UInt256>,
}

impl ConsensusParams {
    /// Bitcoin main network
    pub fn bitcoin_main() -> Self {
        ConsensusParams {
            pow_limit: Target::new(DIFFICULTY_ONE_BITS),
            pow_target_timespan: TARGET_TIMESPAN,
            pow_target_spacing: TARGET_TIME_PER_BLOCK,
            pow_allow_min_difficulty_blocks: false,
            pow_no_retargeting: false,
            genesis_hash: UInt256::from_hex(
                "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
            )
            .ok(),
        }
    }

    /// Bitcoin regression-test network
    pub fn bitcoin_regtest() -> Self {
        ConsensusParams {
            pow_limit: Target::new(0x207fffff),
            pow_target_timespan: TARGET_TIMESPAN,
            pow_target_spacing: TARGET_TIME_PER_BLOCK,
            pow_allow_min_difficulty_blocks: true,
            pow_no_retargeting: true,
            genesis_hash: UInt256::from_hex(
                "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206",
            )
            .ok(),
        }
    }

    /// Number of blocks between retargets
    pub fn difficulty_adjustment_interval(&self) -> u64 {
        self.pow_target_timespan / self.pow_target_spacing
    }

    /// Reject parameter sets the retarget arithmetic cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.pow_target_spacing == 0 {
            return Err(ConsensusError::Config("pow_target_spacing must be non-zero".into()));
        }
        if self.pow_target_timespan < self.pow_target_spacing {
            return Err(ConsensusError::Config(format!(
                "pow_target_timespan {} shorter than one block spacing {}",
                self.pow_target_timespan, self.pow_target_spacing
            )));
        }
        if !self.pow_limit.is_in_pow_range() {
            return Err(ConsensusError::Config(format!(
                "pow_limit {} is not a valid target",
                self.pow_limit
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: ConsensusParams =
            serde_json::from_str(json).map_err(|e| ConsensusError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading consensus params from {}", path.display()))?;
        let params = Self::from_json_str(&contents)
            .with_context(|| format!("parsing consensus params in {}", path.display()))?;
        Ok(params)
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self::bitcoin_main()
    }
}
