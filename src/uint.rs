//! Fixed-width unsigned integers used for hashes and proof-of-work targets
//!
//! Values are stored as little-endian ordered 32-bit words: word 0 holds the
//! least significant bits. The textual form follows the hash display
//! convention, i.e. the big-endian hex string of the value, which is the
//! byte-reversed form of the little-endian wire bytes.

use crate::error::{ConsensusError, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Shl, Shr};
use std::str::FromStr;

macro_rules! fixed_width_uint {
    ($(#[$meta:meta])* $name:ident, $words:expr, $bytes:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name([u32; $words]);

        impl $name {
            /// Width of the type in bytes
            pub const BYTES: usize = $bytes;

            pub const fn zero() -> Self {
                $name([0; $words])
            }

            pub fn one() -> Self {
                Self::from_u64(1)
            }

            pub fn from_u64(value: u64) -> Self {
                let mut words = [0u32; $words];
                words[0] = value as u32;
                words[1] = (value >> 32) as u32;
                $name(words)
            }

            /// Build from raw bytes. The slice length must match the type width exactly.
            pub fn from_bytes(bytes: &[u8], little_endian: bool) -> Result<Self> {
                if bytes.len() != $bytes {
                    return Err(ConsensusError::Format(format!(
                        "{} requires {} bytes, got {}",
                        stringify!($name),
                        $bytes,
                        bytes.len()
                    )));
                }

                let mut le = [0u8; $bytes];
                le.copy_from_slice(bytes);
                if !little_endian {
                    le.reverse();
                }

                let mut words = [0u32; $words];
                for (i, word) in words.iter_mut().enumerate() {
                    *word = u32::from_le_bytes([le[i * 4], le[i * 4 + 1], le[i * 4 + 2], le[i * 4 + 3]]);
                }
                Ok($name(words))
            }

            /// Inverse of [`Self::from_bytes`].
            pub fn to_bytes(&self, little_endian: bool) -> [u8; $bytes] {
                let mut out = [0u8; $bytes];
                for (i, word) in self.0.iter().enumerate() {
                    out[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
                }
                if !little_endian {
                    out.reverse();
                }
                out
            }

            /// Parse the display form (big-endian hex, optional `0x` prefix).
            pub fn from_hex(s: &str) -> Result<Self> {
                let trimmed = s.trim();
                let digits = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .unwrap_or(trimmed);
                let decoded = hex::decode(digits)
                    .map_err(|e| ConsensusError::Format(format!("invalid hex '{}': {}", s, e)))?;
                Self::from_bytes(&decoded, false)
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.to_bytes(false))
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|&w| w == 0)
            }

            /// Lowest 64 bits of the value
            pub fn low_u64(&self) -> u64 {
                (self.0[0] as u64) | ((self.0[1] as u64) << 32)
            }

            /// Position of the highest set bit plus one (0 for zero)
            pub fn bits(&self) -> u32 {
                for i in (0..$words).rev() {
                    if self.0[i] != 0 {
                        return 32 * i as u32 + (32 - self.0[i].leading_zeros());
                    }
                }
                0
            }

            pub fn words(&self) -> &[u32; $words] {
                &self.0
            }

            pub fn to_big_uint(&self) -> BigUint {
                BigUint::from_bytes_le(&self.to_bytes(true))
            }

            /// Fails if the value does not fit the type width.
            pub fn from_big_uint(value: &BigUint) -> Result<Self> {
                let le = value.to_bytes_le();
                if le.len() > $bytes {
                    return Err(ConsensusError::Format(format!(
                        "value needs {} bytes, {} holds {}",
                        le.len(),
                        stringify!($name),
                        $bytes
                    )));
                }
                let mut padded = [0u8; $bytes];
                padded[..le.len()].copy_from_slice(&le);
                Self::from_bytes(&padded, true)
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                for (a, b) in self.0.iter().rev().zip(other.0.iter().rev()) {
                    match a.cmp(b) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                Ordering::Equal
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Shl<u32> for $name {
            type Output = $name;

            fn shl(self, shift: u32) -> $name {
                let mut result = [0u32; $words];
                let word_shift = (shift / 32) as usize;
                let bit_shift = shift % 32;
                for i in 0..$words {
                    if i + word_shift + 1 < $words && bit_shift != 0 {
                        result[i + word_shift + 1] |= self.0[i] >> (32 - bit_shift);
                    }
                    if i + word_shift < $words {
                        result[i + word_shift] |= self.0[i] << bit_shift;
                    }
                }
                $name(result)
            }
        }

        impl Shr<u32> for $name {
            type Output = $name;

            fn shr(self, shift: u32) -> $name {
                let mut result = [0u32; $words];
                let word_shift = (shift / 32) as usize;
                let bit_shift = shift % 32;
                for i in 0..$words {
                    if i >= word_shift + 1 && bit_shift != 0 {
                        result[i - word_shift - 1] |= self.0[i] << (32 - bit_shift);
                    }
                    if i >= word_shift {
                        result[i - word_shift] |= self.0[i] >> bit_shift;
                    }
                }
                $name(result)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = ConsensusError;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_width_uint!(
    /// 256-bit unsigned integer: block hashes, transaction ids, targets
    UInt256,
    8,
    32
);

fixed_width_uint!(
    /// 160-bit unsigned integer: HASH160 script and key hashes
    UInt160,
    5,
    20
);

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";

    #[test]
    fn test_from_bytes_requires_exact_width() {
        assert!(UInt256::from_bytes(&[0u8; 31], true).is_err());
        assert!(UInt256::from_bytes(&[0u8; 33], true).is_err());
        assert!(UInt160::from_bytes(&[0u8; 32], true).is_err());
        assert!(UInt160::from_bytes(&[0u8; 20], true).is_ok());
    }

    #[test]
    fn test_hex_display_is_byte_reversed() {
        let value = UInt256::from_hex(GENESIS).unwrap();
        let le = value.to_bytes(true);
        assert_eq!(le[0], 0x6f);
        assert_eq!(le[31], 0x00);
        assert_eq!(value.to_hex(), GENESIS);
        assert_eq!(value.to_string(), GENESIS);
    }

    #[test]
    fn test_hex_prefix_accepted() {
        let a = UInt256::from_hex(GENESIS).unwrap();
        let b = UInt256::from_hex(&format!("0x{}", GENESIS)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hex_wrong_length_rejected() {
        assert!(UInt256::from_hex("00ff").is_err());
        assert!(UInt160::from_hex(GENESIS).is_err());
        assert!(UInt256::from_hex("zz").is_err());
    }

    #[test]
    fn test_ordering_most_significant_word_first() {
        let small = UInt256::from_u64(u64::MAX);
        let large = UInt256::one() << 64;
        assert!(small < large);
        assert!(large > small);
        assert_eq!(small.cmp(&small), Ordering::Equal);
    }

    #[test]
    fn test_shift_carries_across_words() {
        let value = UInt256::from_u64(0x8000_0000);
        let shifted = value << 1;
        assert_eq!(shifted.words()[0], 0);
        assert_eq!(shifted.words()[1], 1);
        assert_eq!(shifted >> 1, value);

        let value = UInt256::from_u64(0x1234_5678_9abc_def0);
        assert_eq!((value << 40) >> 40, value);
        assert_eq!(value << 0, value);
        assert!((value << 256).is_zero());
        assert!((value >> 256).is_zero());
    }

    #[test]
    fn test_bits() {
        assert_eq!(UInt256::zero().bits(), 0);
        assert_eq!(UInt256::one().bits(), 1);
        assert_eq!((UInt256::one() << 255).bits(), 256);
        assert_eq!(UInt160::from_u64(0xff).bits(), 8);
    }

    #[test]
    fn test_big_uint_conversion() {
        let value = UInt256::from_hex(GENESIS).unwrap();
        let big = value.to_big_uint();
        assert_eq!(UInt256::from_big_uint(&big).unwrap(), value);

        let too_big = BigUint::from(1u32) << 256;
        assert!(UInt256::from_big_uint(&too_big).is_err());
    }

    #[test]
    fn test_serde_as_hex() {
        let value = UInt256::from_hex(GENESIS).unwrap();
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, format!("\"{}\"", GENESIS));
        let back: UInt256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
