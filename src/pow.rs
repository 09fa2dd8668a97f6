//! Proof of work check and difficulty retargeting

use crate::chain::ChainedHeader;
use crate::error::{ConsensusError, Result};
use crate::params::ConsensusParams;
use crate::target::Target;
use crate::uint::UInt256;
use num_bigint::BigInt;
use tracing::{debug, warn};

/// CheckProofOfWork: ℍ × 𝕌32 → {true, false}
///
/// True iff `0 < target < 2^256` and `hash <= target`. Targets outside that
/// range fail rather than error.
pub fn check_proof_of_work(hash: &UInt256, target: Target) -> bool {
    if !target.is_in_pow_range() {
        return false;
    }
    match target.to_uint256() {
        Ok(limit) => *hash <= limit,
        Err(_) => false,
    }
}

/// GetNextWorkRequired: ℋ × ℕ → 𝕌32
///
/// Bits a block building on `last` with timestamp `new_block_time` must carry.
/// `None` means the new block is the genesis block.
pub fn get_next_work_required(
    last: Option<&ChainedHeader>,
    new_block_time: u32,
    params: &ConsensusParams,
) -> Result<Target> {
    let pow_limit = params.pow_limit;
    let last = match last {
        Some(last) => last,
        None => return Ok(pow_limit),
    };

    let interval = params.difficulty_adjustment_interval();
    let next_height = last.height() as u64 + 1;

    if next_height % interval != 0 {
        if params.pow_allow_min_difficulty_blocks {
            // Allow a min-difficulty block after a gap of more than two spacings
            if new_block_time as u64 > last.header().time() as u64 + params.pow_target_spacing * 2 {
                return Ok(pow_limit);
            }
            // Otherwise use the last block that was not mined under that rule
            let mut cursor = last;
            while let Some(previous) = cursor.previous() {
                if cursor.height() as u64 % interval == 0 || cursor.header().bits() != pow_limit {
                    break;
                }
                cursor = previous;
            }
            return Ok(cursor.header().bits());
        }
        return Ok(last.header().bits());
    }

    // next_height is a multiple of the interval, so this cannot underflow
    let first_height = last.height().saturating_sub((interval - 1) as u32);
    let first = match last.get_ancestor(first_height) {
        Some(first) => first,
        None => {
            warn!(
                height = last.height(),
                first_height, "retarget ancestor is not linked into this chain"
            );
            return Err(ConsensusError::PartialChain(format!(
                "no ancestor at height {} below {}",
                first_height,
                last.hash()
            )));
        }
    };

    Ok(calculate_next_work_required(last, first.header().time(), params))
}

/// CalculateNextWorkRequired: the arithmetic half of the retarget.
///
/// `new = old * clamp(actual, timespan/4, timespan*4) / timespan`, capped at the pow limit.
pub fn calculate_next_work_required(
    last: &ChainedHeader,
    first_block_time: u32,
    params: &ConsensusParams,
) -> Target {
    let last_bits = last.header().bits();
    if params.pow_no_retargeting {
        return last_bits;
    }

    let timespan = params.pow_target_timespan as i64;
    let actual = last.header().time() as i64 - first_block_time as i64;
    let clamped = actual.clamp(timespan / 4, timespan * 4);

    let old_target = last_bits.to_big_integer();
    let new_target = old_target * BigInt::from(clamped) / BigInt::from(timespan);

    let result = if new_target > params.pow_limit.to_big_integer() {
        params.pow_limit
    } else {
        Target::from_big_integer(&new_target).unwrap_or(params.pow_limit)
    };

    debug!(
        height = last.height() + 1,
        old_bits = %last_bits,
        new_bits = %result,
        actual_timespan = actual,
        clamped_timespan = clamped,
        "difficulty retarget"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow_rejects_out_of_range_targets() {
        let hash = UInt256::zero();
        assert!(!check_proof_of_work(&hash, Target::new(0)));
        assert!(!check_proof_of_work(&hash, Target::new(0x04923456)));
        assert!(!check_proof_of_work(&hash, Target::new(0x23123456)));
        assert!(!check_proof_of_work(&hash, Target::new(0x01003456)));
    }

    #[test]
    fn test_pow_boundary_is_inclusive() {
        let target = Target::new(0x1d00ffff);
        let limit = target.to_uint256().unwrap();
        assert!(check_proof_of_work(&limit, target));
        let above = limit.to_big_uint() + 1u32;
        assert!(!check_proof_of_work(&UInt256::from_big_uint(&above).unwrap(), target));
    }

    #[test]
    fn test_genesis_requires_pow_limit() {
        let params = ConsensusParams::bitcoin_main();
        assert_eq!(get_next_work_required(None, 0, &params).unwrap(), params.pow_limit);
    }
}
