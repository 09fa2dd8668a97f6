//! Headers bound into a chain position
//!
//! Each [`ChainedHeader`] owns an `Arc` to its parent plus a "skip" pointer to
//! a far ancestor, so ancestor lookups take O(log n) steps. Entries are
//! immutable once built and can be shared across threads.

use crate::error::{ConsensusError, Result};
use crate::header::Header;
use crate::params::ConsensusParams;
use crate::pow;
use crate::target::Target;
use crate::types::Hash;
use num_bigint::BigUint;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Clear the lowest set bit
fn invert_lowest_one(n: u32) -> u32 {
    n & n.wrapping_sub(1)
}

/// Height the skip pointer of a block at `height` points to.
///
/// Any number of steps reaching a height can be covered by at most
/// O(log n) skips plus single steps.
pub fn get_skip_height(height: u32) -> u32 {
    if height < 2 {
        return 0;
    }
    if height & 1 == 1 {
        invert_lowest_one(invert_lowest_one(height - 1)) + 1
    } else {
        invert_lowest_one(height)
    }
}

pub struct ChainedHeader {
    header: RwLock<Arc<Header>>,
    hash: Hash,
    height: u32,
    previous: Option<Arc<ChainedHeader>>,
    skip: Option<Arc<ChainedHeader>>,
    chain_work: BigUint,
}

impl ChainedHeader {
    /// Root of a chain: no parent. `height` is normally 0 but a chain may be
    /// rooted at a checkpoint; the header must declare a zero previous hash.
    pub fn genesis(header: Header, height: u32) -> Result<Arc<Self>> {
        if !header.previous_hash().is_zero() {
            return Err(ConsensusError::InvalidArgument(format!(
                "root header {} declares previous hash {}",
                header.hash(),
                header.previous_hash()
            )));
        }
        let chain_work = header.bits().block_proof();
        Ok(Arc::new(ChainedHeader {
            hash: header.hash(),
            header: RwLock::new(Arc::new(header)),
            height,
            previous: None,
            skip: None,
            chain_work,
        }))
    }

    /// Link `header` on top of `previous`.
    pub fn new(header: Header, previous: Arc<ChainedHeader>) -> Result<Arc<Self>> {
        if header.previous_hash() != &previous.hash {
            return Err(ConsensusError::InvalidArgument(format!(
                "header {} declares previous hash {}, expected {}",
                header.hash(),
                header.previous_hash(),
                previous.hash
            )));
        }
        let height = previous.height.checked_add(1).ok_or_else(|| {
            ConsensusError::InvalidArgument("chain height overflows u32".into())
        })?;

        let skip_height = get_skip_height(height);
        let skip = Self::ancestor_of(&previous, skip_height).cloned();
        let chain_work = &previous.chain_work + header.bits().block_proof();

        Ok(Arc::new(ChainedHeader {
            hash: header.hash(),
            header: RwLock::new(Arc::new(header)),
            height,
            previous: Some(previous),
            skip,
            chain_work,
        }))
    }

    pub fn header(&self) -> Arc<Header> {
        let guard = self.header.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn previous(&self) -> Option<&ChainedHeader> {
        self.previous.as_deref()
    }

    pub fn previous_arc(&self) -> Option<&Arc<ChainedHeader>> {
        self.previous.as_ref()
    }

    pub fn skip(&self) -> Option<&ChainedHeader> {
        self.skip.as_deref()
    }

    /// Total work of the chain up to and including this header
    pub fn chain_work(&self) -> &BigUint {
        &self.chain_work
    }

    /// Work contributed by this header alone
    pub fn block_proof(&self) -> BigUint {
        self.header().bits().block_proof()
    }

    /// Swap the header payload in place.
    ///
    /// The cached hash, height and chain work are NOT recomputed. The new
    /// header must hash to the same value and declare the same parent (for
    /// example a proven header replacing its plain form), otherwise every
    /// invariant of this entry is broken. Callers must serialize this with all
    /// readers of the entry.
    pub fn replace_header(&self, header: Header) -> Arc<Header> {
        let mut guard = self.header.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(header))
    }

    /// One step from `self` toward `height` (which must be below `self.height`):
    /// the skip pointer when it does not overshoot and is no worse than the
    /// parent's own skip, otherwise the parent.
    fn step_toward(&self, height: u32) -> Option<&Arc<ChainedHeader>> {
        if let Some(skip) = &self.skip {
            let height_skip = skip.height as i64;
            let height_skip_prev = get_skip_height(self.height - 1) as i64;
            let target = height as i64;
            if height_skip == target
                || (height_skip > target
                    && !(height_skip_prev < height_skip - 2 && height_skip_prev >= target))
            {
                return Some(skip);
            }
        }
        self.previous.as_ref()
    }

    fn ancestor_of(start: &Arc<ChainedHeader>, height: u32) -> Option<&Arc<ChainedHeader>> {
        if height > start.height {
            return None;
        }
        let mut walk = start;
        while walk.height > height {
            walk = walk.step_toward(height)?;
        }
        Some(walk)
    }

    /// Ancestor at exactly `height`, `None` above this header or below the
    /// root of a partial chain.
    pub fn get_ancestor(&self, height: u32) -> Option<&ChainedHeader> {
        if height > self.height {
            return None;
        }
        if height == self.height {
            return Some(self);
        }
        let next = self.step_toward(height)?;
        Self::ancestor_of(next, height).map(|found| found.as_ref())
    }

    /// Highest header shared by both chains, `None` if they never join.
    pub fn find_fork<'a>(&'a self, other: &'a ChainedHeader) -> Option<&'a ChainedHeader> {
        let (high, low) = if self.height > other.height { (self, other) } else { (other, self) };
        let mut high = high.get_ancestor(low.height)?;
        let mut low = low;

        while high.hash != low.hash {
            let skips_differ = match (&low.skip, &high.skip) {
                (Some(a), Some(b)) => a.hash != b.hash,
                (None, None) => false,
                _ => true,
            };
            if skips_differ {
                low = low.skip.as_deref()?;
                high = high.skip.as_deref()?;
            } else {
                low = low.previous.as_deref()?;
                high = high.previous.as_deref()?;
            }
        }
        Some(high)
    }

    /// Walk from this header down to the root
    pub fn iter_to_genesis(&self) -> impl Iterator<Item = &ChainedHeader> {
        std::iter::successors(Some(self), |entry| entry.previous())
    }

    pub fn find_ancestor_or_self(&self, hash: &Hash) -> Option<&ChainedHeader> {
        self.iter_to_genesis().find(|entry| &entry.hash == hash)
    }

    /// True if `self` is `other` or lies on `other`'s chain.
    pub fn is_ancestor_of(&self, other: &ChainedHeader) -> bool {
        other
            .get_ancestor(self.height)
            .map(|ancestor| ancestor.hash == self.hash)
            .unwrap_or(false)
    }

    /// GetMedianTimePast: median timestamp of the last 11 headers (fewer near the root)
    pub fn median_time_past(&self) -> u32 {
        let mut times: Vec<u32> = self
            .iter_to_genesis()
            .take(crate::constants::MEDIAN_TIME_SPAN)
            .map(|entry| entry.header().time())
            .collect();
        times.sort_unstable();
        times[times.len() / 2]
    }

    /// Block locator: the tip and its eleven predecessors back to back, then
    /// exponentially spaced, always ending with the root.
    pub fn get_locator(&self) -> Vec<Hash> {
        let mut hashes = Vec::with_capacity(32);
        let mut step = 1u32;
        let mut cursor = Some(self);
        while let Some(entry) = cursor {
            hashes.push(entry.hash);
            if entry.previous.is_none() {
                break;
            }
            let next_height = entry.height.saturating_sub(step);
            cursor = entry.get_ancestor(next_height).or_else(|| entry.iter_to_genesis().last());
            if hashes.len() > 10 {
                step = step.saturating_mul(2);
            }
        }
        hashes
    }

    /// Bits this header must carry given its parent
    pub fn get_work_required(&self, params: &ConsensusParams) -> Result<Target> {
        if self.height == 0 {
            return Ok(params.pow_limit);
        }
        pow::get_next_work_required(self.previous(), self.header().time(), params)
    }

    /// Structural and proof-of-work consistency. Every check runs and the
    /// results are ANDed. Proven (proof-of-stake) headers skip the work checks.
    pub fn validate(&self, params: &ConsensusParams) -> bool {
        let header = self.header();

        let genesis_ok = if self.height == 0 {
            self.previous.is_none()
                && params.genesis_hash.map_or(true, |expected| expected == self.hash)
        } else {
            true
        };

        let height_ok = match &self.previous {
            Some(previous) => previous.height.checked_add(1) == Some(self.height),
            None => true,
        };

        let previous_hash_ok = match &self.previous {
            Some(previous) => header.previous_hash() == &previous.hash,
            None => header.previous_hash().is_zero(),
        };

        let hash_ok = header.hash() == self.hash;

        let (pow_ok, bits_ok) = if header.is_proven() {
            (true, true)
        } else {
            let pow_ok = pow::check_proof_of_work(&self.hash, header.bits());
            // A root above height 0 has no history to derive its bits from
            let bits_ok = if self.previous.is_none() && self.height > 0 {
                true
            } else {
                self.get_work_required(params)
                    .map(|required| required == header.bits())
                    .unwrap_or(false)
            };
            (pow_ok, bits_ok)
        };

        let valid = genesis_ok && height_ok && previous_hash_ok && hash_ok && pow_ok && bits_ok;
        if !valid {
            debug!(
                height = self.height,
                hash = %self.hash,
                genesis_ok,
                height_ok,
                previous_hash_ok,
                hash_ok,
                pow_ok,
                bits_ok,
                "chained header failed validation"
            );
        }
        valid
    }
}

impl Drop for ChainedHeader {
    // Unlink iteratively so dropping a long chain does not recurse per block
    fn drop(&mut self) {
        let mut next = self.previous.take();
        while let Some(entry) = next {
            match Arc::try_unwrap(entry) {
                Ok(mut owned) => {
                    owned.skip.take();
                    next = owned.previous.take();
                }
                Err(_) => break,
            }
        }
    }
}

impl fmt::Display for ChainedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.height, self.hash)
    }
}

impl fmt::Debug for ChainedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedHeader")
            .field("height", &self.height)
            .field("hash", &self.hash)
            .field("previous", &self.previous.as_ref().map(|p| p.hash))
            .field("skip", &self.skip.as_ref().map(|s| s.height))
            .field("chain_work", &self.chain_work)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::BlockHeader;
    use crate::uint::UInt256;

    fn header(previous: &Hash, time: u32, bits: u32, salt: u32) -> Header {
        Header::Plain(BlockHeader::new(
            1,
            *previous,
            UInt256::from_u64(salt as u64),
            time,
            Target::new(bits),
            0,
        ))
    }

    /// Chain of `length` headers, one every `spacing` seconds
    fn build_chain(length: u32, bits: u32, spacing: u32, salt: u32) -> Vec<Arc<ChainedHeader>> {
        let mut chain = vec![ChainedHeader::genesis(header(&UInt256::zero(), 1_000_000, bits, salt), 0).unwrap()];
        for i in 1..length {
            let previous = Arc::clone(&chain[i as usize - 1]);
            let next = header(previous.hash(), 1_000_000 + i * spacing, bits, salt);
            chain.push(ChainedHeader::new(next, previous).unwrap());
        }
        chain
    }

    fn extend(tip: &Arc<ChainedHeader>, count: u32, salt: u32) -> Arc<ChainedHeader> {
        let mut tip = Arc::clone(tip);
        for _ in 0..count {
            let next = header(tip.hash(), tip.header().time() + 600, 0x1d00ffff, salt);
            tip = ChainedHeader::new(next, tip).unwrap();
        }
        tip
    }

    #[test]
    fn test_skip_heights() {
        let expected = [(0, 0), (1, 0), (2, 0), (3, 1), (4, 0), (5, 1), (6, 4), (7, 1), (8, 0), (12, 8), (100, 96)];
        for (height, skip) in expected {
            assert_eq!(get_skip_height(height), skip, "height {}", height);
        }
        for height in 2..5000u32 {
            assert!(get_skip_height(height) < height);
        }
    }

    #[test]
    fn test_constructor_invariants() {
        let bad_root = header(&UInt256::one(), 0, 0x1d00ffff, 0);
        assert!(matches!(ChainedHeader::genesis(bad_root, 0), Err(ConsensusError::InvalidArgument(_))));

        let chain = build_chain(3, 0x1d00ffff, 600, 0);
        let orphan = header(&UInt256::one(), 0, 0x1d00ffff, 9);
        assert!(matches!(
            ChainedHeader::new(orphan, Arc::clone(&chain[2])),
            Err(ConsensusError::InvalidArgument(_))
        ));
        assert_eq!(chain[2].height(), 2);
        assert_eq!(chain[2].previous().unwrap().hash(), chain[1].hash());
    }

    #[test]
    fn test_chain_work_accumulates() {
        let chain = build_chain(5, 0x1d00ffff, 600, 0);
        let one = Target::new(0x1d00ffff).block_proof();
        assert_eq!(chain[0].chain_work(), &one);
        assert_eq!(chain[4].chain_work(), &(one * 5u32));

        // An out-of-range target adds nothing
        let tip = &chain[4];
        let zero_work = header(tip.hash(), 0, 0x04923456, 0);
        let next = ChainedHeader::new(zero_work, Arc::clone(tip)).unwrap();
        assert_eq!(next.chain_work(), tip.chain_work());
    }

    #[test]
    fn test_get_ancestor_short_chain() {
        let chain = build_chain(6, 0x1d00ffff, 600, 0);
        let tip = &chain[5];
        for height in 0..=5 {
            assert_eq!(tip.get_ancestor(height).unwrap().hash(), chain[height as usize].hash());
        }
        assert!(tip.get_ancestor(6).is_none());
    }

    #[test]
    fn test_get_ancestor_long_chain_uses_skips() {
        let chain = build_chain(300, 0x1d00ffff, 600, 0);
        let tip = &chain[299];
        assert_eq!(tip.skip().unwrap().height(), get_skip_height(299));
        for height in 0..300 {
            assert_eq!(tip.get_ancestor(height).unwrap().height(), height);
            assert_eq!(tip.get_ancestor(height).unwrap().hash(), chain[height as usize].hash());
        }
        assert!(tip.get_ancestor(300).is_none());
        assert_eq!(chain[150].get_ancestor(17).unwrap().hash(), chain[17].hash());
    }

    #[test]
    fn test_find_fork() {
        let chain = build_chain(50, 0x1d00ffff, 600, 0);
        // Shares heights 0..=29 with `chain`
        let branch = extend(&chain[29], 40, 7);
        let fork = chain[49].find_fork(&branch).unwrap();
        assert_eq!(fork.height(), 29);
        assert_eq!(fork.hash(), chain[29].hash());
        assert_eq!(branch.find_fork(&chain[49]).unwrap().hash(), chain[29].hash());

        // One tip is an ancestor of the other
        assert_eq!(chain[49].find_fork(&chain[10]).unwrap().hash(), chain[10].hash());
        assert!(chain[10].is_ancestor_of(&chain[49]));
        assert!(!chain[49].is_ancestor_of(&chain[10]));

        let only_genesis = extend(&chain[0], 12, 3);
        assert_eq!(only_genesis.find_fork(&chain[49]).unwrap().height(), 0);

        let other = build_chain(50, 0x1d00ffff, 600, 1);
        assert!(other[49].find_fork(&chain[49]).is_none());
    }

    #[test]
    fn test_median_time_past() {
        let chain = build_chain(20, 0x1d00ffff, 600, 0);
        // last 11 times are heights 9..=19
        assert_eq!(chain[19].median_time_past(), 1_000_000 + 14 * 600);
        assert_eq!(chain[2].median_time_past(), 1_000_000 + 600);
        assert_eq!(chain[0].median_time_past(), 1_000_000);

        let root = ChainedHeader::genesis(header(&UInt256::zero(), 500, 0x1d00ffff, 0), 0).unwrap();
        let a = ChainedHeader::new(header(root.hash(), 100, 0x1d00ffff, 0), Arc::clone(&root)).unwrap();
        let b = ChainedHeader::new(header(a.hash(), 300, 0x1d00ffff, 0), Arc::clone(&a)).unwrap();
        assert_eq!(b.median_time_past(), 300);
    }

    #[test]
    fn test_locator_ends_at_root() {
        let chain = build_chain(40, 0x1d00ffff, 600, 0);
        let locator = chain[39].get_locator();
        let mut expected: Vec<usize> = (28..=39).rev().collect();
        expected.extend([26, 22, 14, 0]);
        let heights: Vec<usize> = locator
            .iter()
            .map(|hash| chain.iter().position(|entry| entry.hash() == hash).unwrap())
            .collect();
        assert_eq!(heights, expected);
        assert_eq!(locator.last(), Some(chain[0].hash()));
    }

    #[test]
    fn test_short_locator_is_consecutive() {
        let chain = build_chain(12, 0x1d00ffff, 600, 0);
        let locator = chain[11].get_locator();
        let expected: Vec<Hash> = chain.iter().rev().map(|entry| *entry.hash()).collect();
        assert_eq!(locator, expected);
    }

    #[test]
    fn test_find_ancestor_or_self() {
        let chain = build_chain(10, 0x1d00ffff, 600, 0);
        assert_eq!(chain[9].find_ancestor_or_self(chain[3].hash()).unwrap().height(), 3);
        assert_eq!(chain[9].find_ancestor_or_self(chain[9].hash()).unwrap().height(), 9);
        assert!(chain[3].find_ancestor_or_self(chain[9].hash()).is_none());
        assert_eq!(chain[9].iter_to_genesis().count(), 10);
    }

    fn retarget_chain(bits: u32, spacing: u32) -> Arc<ChainedHeader> {
        let chain = build_chain(2016, bits, spacing, 0);
        Arc::clone(&chain[2015])
    }

    #[test]
    fn test_retarget_on_schedule() {
        let params = ConsensusParams::bitcoin_main();
        let last = retarget_chain(0x1d00ffff, 600);
        let next = pow::get_next_work_required(Some(&last), last.header().time() + 600, &params).unwrap();
        // 2015 intervals of 600s against a 1209600s target
        assert_eq!(next, Target::new(0x1d00ffde));
    }

    #[test]
    fn test_retarget_clamps_fast_blocks_to_quarter() {
        let params = ConsensusParams::bitcoin_main();
        let last = retarget_chain(0x1d00ffff, 1);
        let next = pow::get_next_work_required(Some(&last), last.header().time() + 1, &params).unwrap();
        assert_eq!(next, Target::new(0x1c3fffc0));
    }

    #[test]
    fn test_retarget_clamps_slow_blocks_to_four_times() {
        let params = ConsensusParams::bitcoin_main();
        let last = retarget_chain(0x1c0ffff0, 6000);
        let next = pow::get_next_work_required(Some(&last), last.header().time() + 600, &params).unwrap();
        assert_eq!(next, Target::new(0x1c3fffc0));

        let last = retarget_chain(0x1c0ffff0, 300);
        let next = pow::get_next_work_required(Some(&last), last.header().time() + 600, &params).unwrap();
        // 2015 * 300 is above the quarter floor, so no clamp
        assert!(next.to_big_integer() < Target::new(0x1c0ffff0).to_big_integer());
    }

    #[test]
    fn test_retarget_capped_at_pow_limit() {
        let params = ConsensusParams::bitcoin_main();
        let last = retarget_chain(0x1d00ffff, 1200);
        let next = pow::get_next_work_required(Some(&last), last.header().time() + 600, &params).unwrap();
        assert_eq!(next, params.pow_limit);
    }

    #[test]
    fn test_off_boundary_reuses_last_bits() {
        let params = ConsensusParams::bitcoin_main();
        let chain = build_chain(100, 0x1c0ffff0, 600, 0);
        let next = pow::get_next_work_required(Some(&chain[99]), 0, &params).unwrap();
        assert_eq!(next, Target::new(0x1c0ffff0));
    }

    #[test]
    fn test_no_retargeting_keeps_bits() {
        let mut params = ConsensusParams::bitcoin_main();
        params.pow_no_retargeting = true;
        let last = retarget_chain(0x1c0ffff0, 1);
        let next = pow::get_next_work_required(Some(&last), last.header().time() + 1, &params).unwrap();
        assert_eq!(next, Target::new(0x1c0ffff0));
    }

    #[test]
    fn test_min_difficulty_rules() {
        let mut params = ConsensusParams::bitcoin_main();
        params.pow_allow_min_difficulty_blocks = true;

        let chain = build_chain(10, 0x1c0ffff0, 600, 0);
        let tip = &chain[9];
        let late = tip.header().time() + 1201;
        assert_eq!(pow::get_next_work_required(Some(tip), late, &params).unwrap(), params.pow_limit);

        // A min-difficulty block followed by an on-time block returns to the real bits
        let easy = ChainedHeader::new(header(tip.hash(), late, 0x1d00ffff, 0), Arc::clone(tip)).unwrap();
        let on_time = easy.header().time() + 600;
        assert_eq!(
            pow::get_next_work_required(Some(&easy), on_time, &params).unwrap(),
            Target::new(0x1c0ffff0)
        );
    }

    #[test]
    fn test_partial_chain_cannot_retarget() {
        let params = ConsensusParams::bitcoin_main();
        let root = ChainedHeader::genesis(header(&UInt256::zero(), 1_000_000, 0x1d00ffff, 0), 2000).unwrap();
        let tip = extend(&root, 15, 0);
        assert_eq!(tip.height(), 2015);
        assert!(tip.get_ancestor(0).is_none());
        let err = pow::get_next_work_required(Some(&tip), tip.header().time() + 600, &params).unwrap_err();
        assert!(matches!(err, ConsensusError::PartialChain(_)));
        assert!(err.to_string().contains("Cannot calculate work of a partial chain"));
    }

    fn mine(header: BlockHeader) -> BlockHeader {
        (0..u32::MAX)
            .map(|nonce| header.with_nonce(nonce))
            .find(|candidate| candidate.check_proof_of_work())
            .unwrap()
    }

    fn regtest_genesis() -> BlockHeader {
        BlockHeader::new(
            1,
            UInt256::zero(),
            UInt256::from_hex("4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b").unwrap(),
            1296688602,
            Target::new(0x207fffff),
            2,
        )
    }

    #[test]
    fn test_validate_regtest_chain() {
        let params = ConsensusParams::bitcoin_regtest();
        let genesis = ChainedHeader::genesis(Header::Plain(regtest_genesis()), 0).unwrap();
        assert!(genesis.validate(&params));

        let mut tip = Arc::clone(&genesis);
        for i in 1..=5u32 {
            let candidate = BlockHeader::new(2, *tip.hash(), UInt256::from_u64(i as u64), 1296688602 + i * 600, Target::new(0x207fffff), 0);
            tip = ChainedHeader::new(Header::Plain(mine(candidate)), tip).unwrap();
            assert!(tip.validate(&params));
        }

        // Wrong bits fail even with valid work
        let wrong = mine(BlockHeader::new(2, *tip.hash(), UInt256::zero(), 1296692000, Target::new(0x207ffffe), 0));
        let bad = ChainedHeader::new(Header::Plain(wrong), Arc::clone(&tip)).unwrap();
        assert!(!bad.validate(&params));
    }

    #[test]
    fn test_validate_rejects_wrong_genesis() {
        let params = ConsensusParams::bitcoin_regtest();
        let other = mine(BlockHeader::new(1, UInt256::zero(), UInt256::one(), 0, Target::new(0x207fffff), 0));
        let root = ChainedHeader::genesis(Header::Plain(other), 0).unwrap();
        assert!(!root.validate(&params));
    }

    #[test]
    fn test_replace_header() {
        let params = ConsensusParams::bitcoin_regtest();
        let genesis = ChainedHeader::genesis(Header::Plain(regtest_genesis()), 0).unwrap();

        let old = genesis.replace_header(Header::Plain(regtest_genesis()));
        assert_eq!(old.hash(), *genesis.hash());
        assert!(genesis.validate(&params));

        genesis.replace_header(Header::Plain(regtest_genesis().with_nonce(3)));
        assert!(!genesis.validate(&params));
    }
}
