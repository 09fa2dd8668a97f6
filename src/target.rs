//! Compact difficulty targets ("nBits")
//!
//! A compact target packs a 1-byte exponent and a 3-byte mantissa:
//! `value = mantissa * 256^(exponent - 3)`. Bit 0x00800000 of the mantissa is
//! a sign flag. Negative targets can never be satisfied but they must decode
//! exactly as the historical encoder produced them.

use crate::constants::DIFFICULTY_ONE_BITS;
use crate::error::{ConsensusError, Result};
use crate::uint::UInt256;
use num_bigint::{BigInt, BigUint, Sign};
use serde::{Deserialize, Serialize};
use std::fmt;

const MANTISSA_MASK: u32 = 0x007fffff;
const SIGN_BIT: u32 = 0x00800000;

/// Compact target as found in block headers
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(u32);

impl Target {
    pub const fn new(compact: u32) -> Self {
        Target(compact)
    }

    pub fn to_compact(&self) -> u32 {
        self.0
    }

    fn exponent(&self) -> u32 {
        self.0 >> 24
    }

    fn mantissa(&self) -> u32 {
        self.0 & MANTISSA_MASK
    }

    /// True when the sign flag is set and the mantissa is still non-zero
    /// after small exponents shift away its low bytes
    pub fn is_negative(&self) -> bool {
        self.to_big_integer().sign() == Sign::Minus
    }

    /// compactToBigInteger: 𝕌32 → ℤ
    ///
    /// Exponents below 3 shift the mantissa right and drop the low bytes.
    pub fn to_big_integer(&self) -> BigInt {
        let exponent = self.exponent();
        let mut word = self.mantissa();
        let magnitude = if exponent <= 3 {
            word >>= 8 * (3 - exponent);
            BigUint::from(word)
        } else {
            BigUint::from(word) << (8 * (exponent - 3)) as usize
        };

        let sign = if word == 0 {
            Sign::NoSign
        } else if self.0 & SIGN_BIT != 0 {
            Sign::Minus
        } else {
            Sign::Plus
        };
        BigInt::from_biguint(sign, magnitude)
    }

    /// Encode an integer back to compact form.
    ///
    /// A mantissa whose top bit would collide with the sign flag is shifted
    /// down one byte and the exponent bumped, so encodings are many-to-one for
    /// non-canonical inputs.
    pub fn from_big_integer(value: &BigInt) -> Result<Target> {
        let negative = value.sign() == Sign::Minus;
        let magnitude = value.magnitude();

        let mut size = ((magnitude.bits() + 7) / 8) as u32;
        let mut compact: u32 = if size <= 3 {
            let low = low_u64(magnitude);
            (low << (8 * (3 - size))) as u32
        } else {
            let shifted: BigUint = magnitude >> (8 * (size - 3)) as usize;
            low_u64(&shifted) as u32
        };

        if compact & SIGN_BIT != 0 {
            compact >>= 8;
            size += 1;
        }

        if size > 0xff {
            return Err(ConsensusError::Format(format!(
                "value of {} bytes does not fit a compact target",
                size
            )));
        }

        compact |= size << 24;
        if negative && compact & MANTISSA_MASK != 0 {
            compact |= SIGN_BIT;
        }
        Ok(Target(compact))
    }

    pub fn from_uint256(value: &UInt256) -> Target {
        let size = (value.bits() + 7) / 8;
        let mut compact: u32 = if size <= 3 {
            (value.low_u64() << (8 * (3 - size))) as u32
        } else {
            (*value >> (8 * (size - 3))).low_u64() as u32
        };
        let mut size = size;
        if compact & SIGN_BIT != 0 {
            compact >>= 8;
            size += 1;
        }
        Target(compact | (size << 24))
    }

    /// Fails for negative targets and for targets that do not fit 256 bits.
    pub fn to_uint256(&self) -> Result<UInt256> {
        let value = self.to_big_integer();
        if value.sign() == Sign::Minus {
            return Err(ConsensusError::InvalidProofOfWork(format!(
                "negative target {}",
                self
            )));
        }
        UInt256::from_big_uint(value.magnitude())
            .map_err(|_| ConsensusError::InvalidProofOfWork(format!("target {} overflows 256 bits", self)))
    }

    /// True when `0 < target < 2^256`, the only range in which proof of work is meaningful.
    pub fn is_in_pow_range(&self) -> bool {
        let value = self.to_big_integer();
        value.sign() == Sign::Plus && value.magnitude().bits() <= 256
    }

    /// Expected number of hashes needed to meet this target: `2^256 / (target + 1)`.
    /// Out-of-range targets contribute no work.
    pub fn block_proof(&self) -> BigUint {
        if !self.is_in_pow_range() {
            return BigUint::from(0u32);
        }
        let target = self.to_big_integer().magnitude().clone();
        (BigUint::from(1u32) << 256usize) / (target + BigUint::from(1u32))
    }

    /// Difficulty relative to the difficulty-1 target
    pub fn difficulty(&self) -> f64 {
        let one_shift = (DIFFICULTY_ONE_BITS >> 24) as i32;
        let mut shift = ((self.0 >> 24) & 0xff) as i32;
        let mantissa = self.0 & 0x00ffffff;
        if mantissa == 0 {
            return f64::INFINITY;
        }
        let mut diff = (DIFFICULTY_ONE_BITS & 0x00ffffff) as f64 / mantissa as f64;
        while shift < one_shift {
            diff *= 256.0;
            shift += 1;
        }
        while shift > one_shift {
            diff /= 256.0;
            shift -= 1;
        }
        diff
    }
}

fn low_u64(value: &BigUint) -> u64 {
    value.iter_u64_digits().next().unwrap_or(0)
}

impl From<u32> for Target {
    fn from(compact: u32) -> Self {
        Target(compact)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target(0x{:08x})", self.0)
    }
}
