//! Core transaction and block types

use crate::error::{ConsensusError, Result};
use crate::factory::ConsensusFactory;
use crate::header::Header;
use crate::serialization::{Deserializable, Serializable, StreamReader, StreamWriter};
use crate::uint::UInt256;
use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Hash type: 256-bit hash
pub type Hash = UInt256;

/// Byte string type
pub type ByteString = Vec<u8>;

/// SHA256(SHA256(x)) as a little-endian 256-bit value
pub fn double_sha256(data: &[u8]) -> UInt256 {
    let mut engine = sha256d::Hash::engine();
    engine.input(data);
    let digest = sha256d::Hash::from_engine(engine).into_inner();
    UInt256::from_bytes(&digest, true).unwrap_or_default()
}

/// OutPoint: 𝒪 = ℍ × ℕ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
}

impl OutPoint {
    pub fn new(hash: Hash, index: u32) -> Self {
        OutPoint { hash, index }
    }

    /// The outpoint a coinbase input refers to
    pub fn null() -> Self {
        OutPoint { hash: UInt256::zero(), index: u32::MAX }
    }

    pub fn is_null(&self) -> bool {
        self.hash.is_zero() && self.index == u32::MAX
    }
}

impl Serializable for OutPoint {
    fn serialize(&self, writer: &mut StreamWriter) {
        writer.write_uint256(&self.hash);
        writer.write_u32(self.index);
    }
}

impl OutPoint {
    fn read(reader: &mut StreamReader<'_>) -> Result<Self> {
        Ok(OutPoint { hash: reader.read_uint256()?, index: reader.read_u32()? })
    }
}

/// Transaction Input: ℐ = 𝒪 × 𝕊 × ℕ × 𝕊*
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub script_sig: ByteString,
    pub sequence: u32,
    /// Segregated witness stack, empty for legacy spends
    #[serde(default)]
    pub witness: Vec<ByteString>,
}

impl TransactionInput {
    pub fn new(prevout: OutPoint, script_sig: ByteString, sequence: u32) -> Self {
        TransactionInput { prevout, script_sig, sequence, witness: Vec::new() }
    }
}

/// Transaction Output: 𝒯 = ℤ × 𝕊
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionOutput {
    pub value: i64,
    pub script_pubkey: ByteString,
}

impl TransactionOutput {
    pub fn new(value: i64, script_pubkey: ByteString) -> Self {
        TransactionOutput { value, script_pubkey }
    }

    /// Coinstake marker output: zero value, empty script
    pub fn is_empty(&self) -> bool {
        self.value == 0 && self.script_pubkey.is_empty()
    }
}

impl Serializable for TransactionOutput {
    fn serialize(&self, writer: &mut StreamWriter) {
        writer.write_i64(self.value);
        writer.write_var_bytes(&self.script_pubkey);
    }
}

/// Set by `OP_CHECKCOLDSTAKEVERIFY` while the owning transaction is only borrowed.
#[derive(Default)]
pub struct ColdStakeMark(AtomicBool);

impl ColdStakeMark {
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl Clone for ColdStakeMark {
    fn clone(&self) -> Self {
        ColdStakeMark(AtomicBool::new(self.get()))
    }
}

impl PartialEq for ColdStakeMark {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl Eq for ColdStakeMark {}

impl fmt::Debug for ColdStakeMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Transaction: 𝒯𝒳 = ℕ × ℐ* × 𝒯* × ℕ
///
/// `time` is present only on proof-of-stake networks, where it is serialized
/// right after the version.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub version: i32,
    #[serde(default)]
    pub time: Option<u32>,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
    #[serde(skip)]
    pub is_cold_coin_stake: ColdStakeMark,
}

impl Transaction {
    pub fn new(version: i32, inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>, lock_time: u32) -> Self {
        Transaction {
            version,
            time: None,
            inputs,
            outputs,
            lock_time,
            is_cold_coin_stake: ColdStakeMark::default(),
        }
    }

    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    /// Coinstake: spends a real outpoint and marks itself with an empty first output.
    pub fn is_coinstake(&self) -> bool {
        !self.inputs.is_empty()
            && !self.inputs[0].prevout.is_null()
            && self.outputs.len() >= 2
            && self.outputs[0].is_empty()
    }

    pub fn is_cold_coin_stake(&self) -> bool {
        self.is_cold_coin_stake.get()
    }

    /// Identifier over the witness-stripped encoding
    pub fn txid(&self) -> Hash {
        let mut writer = StreamWriter::new();
        self.serialize_with(&mut writer, false);
        double_sha256(writer.as_slice())
    }

    pub fn wtxid(&self) -> Hash {
        let mut writer = StreamWriter::new();
        self.serialize_with(&mut writer, true);
        double_sha256(writer.as_slice())
    }

    /// Encode, optionally with the BIP144 marker/flag and witness stacks.
    pub fn serialize_with(&self, writer: &mut StreamWriter, allow_witness: bool) {
        writer.write_i32(self.version);
        if let Some(time) = self.time {
            writer.write_u32(time);
        }

        let with_witness = allow_witness && self.has_witness();
        if with_witness {
            writer.write_u8(0x00);
            writer.write_u8(0x01);
        }

        writer.write_compact_size(self.inputs.len() as u64);
        for input in &self.inputs {
            writer.write(&input.prevout);
            writer.write_var_bytes(&input.script_sig);
            writer.write_u32(input.sequence);
        }
        writer.write_vec(&self.outputs);

        if with_witness {
            for input in &self.inputs {
                writer.write_compact_size(input.witness.len() as u64);
                for item in &input.witness {
                    writer.write_var_bytes(item);
                }
            }
        }
        writer.write_u32(self.lock_time);
    }
}

impl Serializable for Transaction {
    fn serialize(&self, writer: &mut StreamWriter) {
        self.serialize_with(writer, true);
    }
}

fn read_inputs(reader: &mut StreamReader<'_>) -> Result<Vec<TransactionInput>> {
    let count = reader.read_length()?;
    let mut inputs = Vec::with_capacity(count);
    for _ in 0..count {
        let prevout = OutPoint::read(reader)?;
        let script_sig = reader.read_var_bytes()?;
        let sequence = reader.read_u32()?;
        inputs.push(TransactionInput::new(prevout, script_sig, sequence));
    }
    Ok(inputs)
}

fn read_outputs(reader: &mut StreamReader<'_>) -> Result<Vec<TransactionOutput>> {
    let count = reader.read_length()?;
    let mut outputs = Vec::with_capacity(count);
    for _ in 0..count {
        let value = reader.read_i64()?;
        let script_pubkey = reader.read_var_bytes()?;
        outputs.push(TransactionOutput { value, script_pubkey });
    }
    Ok(outputs)
}

impl Deserializable for Transaction {
    fn deserialize(reader: &mut StreamReader<'_>, factory: &dyn ConsensusFactory) -> Result<Self> {
        let mut tx = factory.create_transaction();
        tx.version = reader.read_i32()?;
        if tx.time.is_some() {
            tx.time = Some(reader.read_u32()?);
        }

        let mut flags = 0u8;
        tx.inputs = read_inputs(reader)?;
        if tx.inputs.is_empty() {
            flags = reader.read_u8()?;
            if flags != 0 {
                tx.inputs = read_inputs(reader)?;
                tx.outputs = read_outputs(reader)?;
            }
        } else {
            tx.outputs = read_outputs(reader)?;
        }

        if flags & 1 != 0 {
            flags ^= 1;
            for input in tx.inputs.iter_mut() {
                let items = reader.read_length()?;
                let mut witness = Vec::with_capacity(items);
                for _ in 0..items {
                    witness.push(reader.read_var_bytes()?);
                }
                input.witness = witness;
            }
            if !tx.has_witness() {
                return Err(ConsensusError::Serialization("superfluous witness record".into()));
            }
        }
        if flags != 0 {
            return Err(ConsensusError::Serialization(format!(
                "unknown transaction optional data {:#04x}",
                flags
            )));
        }

        tx.lock_time = reader.read_u32()?;
        Ok(tx)
    }
}

/// Block: ℬ = ℋ × 𝒯𝒳*
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Serializable for Block {
    fn serialize(&self, writer: &mut StreamWriter) {
        self.header.serialize(writer);
        writer.write_vec(&self.transactions);
    }
}

impl Deserializable for Block {
    fn deserialize(reader: &mut StreamReader<'_>, factory: &dyn ConsensusFactory) -> Result<Self> {
        let header = Header::deserialize(reader, factory)?;
        let count = reader.read_length()?;
        let mut transactions = Vec::with_capacity(count);
        for _ in 0..count {
            transactions.push(Transaction::deserialize(reader, factory)?);
        }
        Ok(Block { header, transactions })
    }
}
