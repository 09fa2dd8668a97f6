//! Transaction signature hashes
//!
//! Legacy (pre-segwit) and BIP143 witness v0 digests. Both commit to the
//! script code handed in by the interpreter; the legacy digest also strips
//! `OP_CODESEPARATOR` from it.

use crate::error::{ConsensusError, Result};
use crate::script::remove_code_separators;
use crate::serialization::StreamWriter;
use crate::types::{double_sha256, Hash, Transaction, TransactionOutput};
use crate::uint::UInt256;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_NONE: u32 = 0x02;
pub const SIGHASH_SINGLE: u32 = 0x03;
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// The hash type byte appended to every ECDSA signature
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SigHash(u32);

impl SigHash {
    pub const ALL: SigHash = SigHash(SIGHASH_ALL);
    pub const NONE: SigHash = SigHash(SIGHASH_NONE);
    pub const SINGLE: SigHash = SigHash(SIGHASH_SINGLE);

    pub const fn new(raw: u32) -> Self {
        SigHash(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn with_anyone_can_pay(self) -> Self {
        SigHash(self.0 | SIGHASH_ANYONECANPAY)
    }

    pub fn anyone_can_pay(&self) -> bool {
        self.0 & SIGHASH_ANYONECANPAY != 0
    }

    /// ALL, NONE or SINGLE with the ANYONECANPAY bit removed
    pub fn base_type(&self) -> u32 {
        self.0 & 0x1f
    }

    /// Strict encoding accepts only the three base types, optionally with ANYONECANPAY
    pub fn is_defined(&self) -> bool {
        let base = self.0 & !SIGHASH_ANYONECANPAY;
        (SIGHASH_ALL..=SIGHASH_SINGLE).contains(&base)
    }
}

impl From<u8> for SigHash {
    fn from(byte: u8) -> Self {
        SigHash(byte as u32)
    }
}

impl fmt::Debug for SigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigHash(0x{:02x})", self.0)
    }
}

/// Which digest algorithm a signature commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashVersion {
    Original,
    WitnessV0,
}

/// Per-transaction BIP143 intermediate hashes, computed once and shared by
/// every input of the transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecomputedTransactionData {
    pub hash_prevouts: Hash,
    pub hash_sequence: Hash,
    pub hash_outputs: Hash,
}

impl PrecomputedTransactionData {
    pub fn new(tx: &Transaction) -> Self {
        PrecomputedTransactionData {
            hash_prevouts: hash_prevouts(tx),
            hash_sequence: hash_sequence(tx),
            hash_outputs: hash_outputs(tx),
        }
    }
}

fn hash_prevouts(tx: &Transaction) -> Hash {
    let mut writer = StreamWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write(&input.prevout);
    }
    double_sha256(writer.as_slice())
}

fn hash_sequence(tx: &Transaction) -> Hash {
    let mut writer = StreamWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32(input.sequence);
    }
    double_sha256(writer.as_slice())
}

fn hash_outputs(tx: &Transaction) -> Hash {
    let mut writer = StreamWriter::new();
    for output in &tx.outputs {
        writer.write(output);
    }
    double_sha256(writer.as_slice())
}

/// Digest a signature over input `input_index` of `tx` commits to.
///
/// Legacy digests keep the historical quirks: an out-of-range input, or
/// SIGHASH_SINGLE without a matching output, hashes to the constant one.
pub fn signature_hash(
    script_code: &[u8],
    tx: &Transaction,
    input_index: usize,
    hash_type: SigHash,
    amount: i64,
    version: HashVersion,
    precomputed: Option<&PrecomputedTransactionData>,
) -> Result<Hash> {
    match version {
        HashVersion::Original => Ok(legacy_signature_hash(script_code, tx, input_index, hash_type)),
        HashVersion::WitnessV0 => {
            witness_v0_signature_hash(script_code, tx, input_index, hash_type, amount, precomputed)
        }
    }
}

fn legacy_signature_hash(script_code: &[u8], tx: &Transaction, input_index: usize, hash_type: SigHash) -> Hash {
    let base = hash_type.base_type();
    if input_index >= tx.inputs.len() || (base == SIGHASH_SINGLE && input_index >= tx.outputs.len()) {
        return UInt256::one();
    }

    let script_code = remove_code_separators(script_code);
    let mut writer = StreamWriter::new();
    writer.write_i32(tx.version);
    if let Some(time) = tx.time {
        writer.write_u32(time);
    }

    let anyone_can_pay = hash_type.anyone_can_pay();
    let inputs: Vec<usize> = if anyone_can_pay { vec![input_index] } else { (0..tx.inputs.len()).collect() };
    writer.write_compact_size(inputs.len() as u64);
    for i in inputs {
        let input = &tx.inputs[i];
        writer.write(&input.prevout);
        if i == input_index {
            writer.write_var_bytes(&script_code);
        } else {
            writer.write_var_bytes(&[]);
        }
        // Other inputs' sequences are blanked so they can be updated without invalidating this signature
        if i != input_index && (base == SIGHASH_NONE || base == SIGHASH_SINGLE) {
            writer.write_u32(0);
        } else {
            writer.write_u32(input.sequence);
        }
    }

    match base {
        SIGHASH_NONE => writer.write_compact_size(0),
        SIGHASH_SINGLE => {
            writer.write_compact_size(input_index as u64 + 1);
            let blank = TransactionOutput::new(-1, Vec::new());
            for _ in 0..input_index {
                writer.write(&blank);
            }
            writer.write(&tx.outputs[input_index]);
        }
        _ => writer.write_vec(&tx.outputs),
    }

    writer.write_u32(tx.lock_time);
    writer.write_u32(hash_type.raw());
    double_sha256(writer.as_slice())
}

fn witness_v0_signature_hash(
    script_code: &[u8],
    tx: &Transaction,
    input_index: usize,
    hash_type: SigHash,
    amount: i64,
    precomputed: Option<&PrecomputedTransactionData>,
) -> Result<Hash> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        ConsensusError::InvalidArgument(format!(
            "input index {} out of range for {} inputs",
            input_index,
            tx.inputs.len()
        ))
    })?;
    let base = hash_type.base_type();
    let anyone_can_pay = hash_type.anyone_can_pay();

    let prevouts = if anyone_can_pay {
        UInt256::zero()
    } else {
        precomputed.map(|p| p.hash_prevouts).unwrap_or_else(|| hash_prevouts(tx))
    };

    let sequence = if anyone_can_pay || base == SIGHASH_SINGLE || base == SIGHASH_NONE {
        UInt256::zero()
    } else {
        precomputed.map(|p| p.hash_sequence).unwrap_or_else(|| hash_sequence(tx))
    };

    let outputs = if base != SIGHASH_SINGLE && base != SIGHASH_NONE {
        precomputed.map(|p| p.hash_outputs).unwrap_or_else(|| hash_outputs(tx))
    } else if base == SIGHASH_SINGLE && input_index < tx.outputs.len() {
        let mut writer = StreamWriter::new();
        writer.write(&tx.outputs[input_index]);
        double_sha256(writer.as_slice())
    } else {
        UInt256::zero()
    };

    let mut writer = StreamWriter::with_capacity(160 + script_code.len());
    writer.write_i32(tx.version);
    writer.write_uint256(&prevouts);
    writer.write_uint256(&sequence);
    writer.write(&input.prevout);
    writer.write_var_bytes(script_code);
    writer.write_i64(amount);
    writer.write_u32(input.sequence);
    writer.write_uint256(&outputs);
    writer.write_u32(tx.lock_time);
    writer.write_u32(hash_type.raw());
    Ok(double_sha256(writer.as_slice()))
}
